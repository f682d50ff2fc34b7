//! Compile-time registry of region level definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! A level definition ties a [`RegionLevel`] to its datastore table, the
//! code/name property names of its boundary file, the boundary file
//! locations, and any legacy-code remapping. Adding a level requires a
//! TOML file in `levels/` and an entry here; no pipeline logic changes.

use std::sync::LazyLock;

use regioniq_region_models::{LevelDefinition, RegionLevel};

/// Embedded TOML level definitions.
const LEVEL_TOMLS: &[(&str, &str)] = &[
    ("national", include_str!("../levels/national.toml")),
    ("itl1", include_str!("../levels/itl1.toml")),
    ("itl2", include_str!("../levels/itl2.toml")),
    ("itl3", include_str!("../levels/itl3.toml")),
    ("lad", include_str!("../levels/lad.toml")),
];

static LEVELS: LazyLock<Vec<LevelDefinition>> = LazyLock::new(|| {
    LEVEL_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse level definition '{name}': {e}"))
        })
        .collect()
});

/// Returns all registered level definitions, coarsest first.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_levels() -> &'static [LevelDefinition] {
    &LEVELS
}

/// Returns the definition for `level`.
///
/// # Panics
///
/// Panics if no definition is registered for `level`, which the tests
/// below rule out.
#[must_use]
pub fn level_definition(level: RegionLevel) -> &'static LevelDefinition {
    all_levels()
        .iter()
        .find(|def| def.level == level)
        .unwrap_or_else(|| panic!("No level definition registered for {level}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn one_definition_per_level() {
        let defs = all_levels();
        assert_eq!(defs.len(), RegionLevel::all().len());
        let seen: BTreeSet<RegionLevel> = defs.iter().map(|d| d.level).collect();
        assert_eq!(seen.len(), defs.len(), "duplicate level definition");
        for level in RegionLevel::all() {
            assert_eq!(level_definition(*level).level, *level);
        }
    }

    #[test]
    fn definitions_have_required_fields() {
        for def in all_levels() {
            assert!(!def.table.is_empty(), "{} has empty table", def.level);
            assert!(
                !def.code_property.is_empty(),
                "{} has empty code property",
                def.level
            );
            assert!(
                !def.name_property.is_empty(),
                "{} has empty name property",
                def.level
            );
            assert!(
                def.boundary_path.ends_with(".geojson"),
                "{} boundary path is not GeoJSON",
                def.level
            );
        }
    }

    #[test]
    fn code_properties_are_unique() {
        let mut seen = BTreeSet::new();
        for def in all_levels() {
            assert!(
                seen.insert(def.code_property.as_str()),
                "code property {} reused by {}",
                def.code_property,
                def.level
            );
        }
    }

    #[test]
    fn legacy_codes_do_not_chain() {
        for def in all_levels() {
            for (old, new) in &def.legacy_codes {
                assert_ne!(old, new, "{} maps {old} to itself", def.level);
                assert!(
                    !def.legacy_codes.contains_key(new),
                    "{} remaps {old} -> {new}, which is itself remapped",
                    def.level
                );
            }
        }
    }

    #[test]
    fn level_tables() {
        assert_eq!(
            level_definition(RegionLevel::National).table,
            "macro_latest_all"
        );
        assert_eq!(
            level_definition(RegionLevel::National)
                .fallback_table
                .as_deref(),
            Some("uk_latest_all")
        );
        assert_eq!(level_definition(RegionLevel::Itl1).table, "itl1_latest_all");
        assert_eq!(level_definition(RegionLevel::Lad).table, "lad_latest_all");
        assert_eq!(
            level_definition(RegionLevel::Lad).resolve_code("E07000163"),
            "E06000065"
        );
    }
}
