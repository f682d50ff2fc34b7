//! Joins boundary features with the value index.

use std::collections::{BTreeMap, BTreeSet};

use geojson::{Geometry, Value};
use regioniq_choropleth_models::{EnrichedFeature, ValueIndex};
use regioniq_region_models::{
    LevelDefinition, RegionLevel,
    codes::to_boundary_code,
    geometry::{LevelGeometry, feature_bbox, string_property},
};

/// Enriches `geometry` with values, selection and mask flags.
///
/// Returns `None` unless both the geometry and `def` belong to
/// `active_level`, so one level's shapes are never painted with another
/// level's values. `selected` and `mask` may use datastore or boundary
/// codes. Features without a code property are skipped.
///
/// Every resolved code appears once. Features that resolve to the same
/// code through a legacy remap (several old districts merged into one
/// new authority) are folded into the first one: their polygons join a
/// single multipolygon and their extents are unioned.
#[must_use]
pub fn enrich(
    geometry: &LevelGeometry,
    active_level: RegionLevel,
    def: &LevelDefinition,
    index: &ValueIndex,
    selected: Option<&str>,
    mask: Option<&BTreeSet<String>>,
) -> Option<Vec<EnrichedFeature>> {
    if !geometry.matches(active_level) || def.level != active_level {
        log::debug!(
            "Not enriching {} geometry for active level {active_level}",
            geometry.level
        );
        return None;
    }

    let normalize = |code: &str| def.resolve_code(&to_boundary_code(active_level, code)).to_string();
    let selected = selected.map(&normalize);
    let mask: Option<BTreeSet<String>> = mask.map(|codes| codes.iter().map(|c| normalize(c)).collect());

    let mut skipped = 0_usize;
    let mut merged = 0_usize;
    let mut position: BTreeMap<String, usize> = BTreeMap::new();
    let mut features: Vec<EnrichedFeature> = Vec::with_capacity(geometry.features.len());

    for feature in &geometry.features {
        let Some(raw) = string_property(feature, &def.code_property) else {
            skipped += 1;
            continue;
        };
        let code = def.resolve_code(&raw).to_string();

        if let Some(&i) = position.get(&code) {
            let existing = &mut features[i];
            existing.geometry = merge_geometry(existing.geometry.take(), feature.geometry.as_ref());
            existing.bbox = match (existing.bbox, feature_bbox(feature)) {
                (Some(a), Some(b)) => Some(a.union(&b)),
                (a, b) => a.or(b),
            };
            merged += 1;
            continue;
        }

        position.insert(code.clone(), features.len());
        features.push(EnrichedFeature {
            name: string_property(feature, &def.name_property),
            value: index.get(&code),
            selected: selected.as_deref() == Some(code.as_str()),
            in_parent: mask.as_ref().is_none_or(|m| m.contains(&code)),
            bbox: feature_bbox(feature),
            geometry: feature.geometry.clone(),
            properties: feature.properties.clone().unwrap_or_default(),
            code,
        });
    }

    if merged > 0 {
        log::debug!("Merged {merged} {active_level} features sharing a remapped code");
    }
    if skipped > 0 {
        log::warn!(
            "Skipped {skipped} {active_level} features without a '{}' property",
            def.code_property
        );
    }

    Some(features)
}

/// Joins two area geometries into one multipolygon.
///
/// Non-area geometry cannot be merged; the first geometry is kept.
fn merge_geometry(first: Option<Geometry>, second: Option<&Geometry>) -> Option<Geometry> {
    let Some(second) = second else {
        return first;
    };
    let Some(first) = first else {
        return Some(second.clone());
    };

    let polygons = |value: &Value| match value {
        Value::Polygon(p) => Some(vec![p.clone()]),
        Value::MultiPolygon(ps) => Some(ps.clone()),
        _ => None,
    };
    match (polygons(&first.value), polygons(&second.value)) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(Geometry::new(Value::MultiPolygon(a)))
        }
        _ => Some(first),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use geojson::{Feature, JsonObject, JsonValue};

    pub fn square(code_property: &str, code: &str, x: f64, y: f64) -> Feature {
        let ring = vec![
            vec![x, y],
            vec![x + 1.0, y],
            vec![x + 1.0, y + 1.0],
            vec![x, y + 1.0],
            vec![x, y],
        ];
        let mut properties = JsonObject::new();
        properties.insert(code_property.to_string(), JsonValue::from(code));
        properties.insert("name".to_string(), JsonValue::from(format!("Region {code}")));
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    pub fn definition(level: RegionLevel, code_property: &str) -> LevelDefinition {
        LevelDefinition {
            level,
            table: format!("{}_latest_all", level.as_ref().to_lowercase()),
            fallback_table: None,
            code_property: code_property.to_string(),
            name_property: "name".to_string(),
            boundary_path: String::new(),
            fallback_boundary_path: String::new(),
            legacy_codes: BTreeMap::new(),
        }
    }

    fn itl1() -> (LevelGeometry, LevelDefinition) {
        let geometry = LevelGeometry::new(
            RegionLevel::Itl1,
            vec![
                square("ITL125CD", "TLC", -2.0, 54.0),
                square("ITL125CD", "TLI", -0.5, 51.0),
                square("ITL125CD", "TLN", -7.0, 54.0),
            ],
        );
        (geometry, definition(RegionLevel::Itl1, "ITL125CD"))
    }

    fn index(entries: &[(&str, f64)]) -> ValueIndex {
        let mut index = ValueIndex::new();
        for (code, value) in entries {
            index.insert(*code, Some(*value));
        }
        index
    }

    #[test]
    fn level_mismatch_refuses_to_enrich() {
        let (geometry, def) = itl1();
        let values = index(&[("TLC", 1.0)]);
        assert!(enrich(&geometry, RegionLevel::Lad, &def, &values, None, None).is_none());

        let lad_def = definition(RegionLevel::Lad, "LAD24CD");
        assert!(enrich(&geometry, RegionLevel::Itl1, &lad_def, &values, None, None).is_none());
    }

    #[test]
    fn values_join_by_code() {
        let (geometry, def) = itl1();
        let values = index(&[("TLC", 1.0), ("TLI", 2.0)]);
        let features = enrich(&geometry, RegionLevel::Itl1, &def, &values, None, None).unwrap();

        let joined: Vec<(&str, Option<f64>)> =
            features.iter().map(|f| (f.code.as_str(), f.value)).collect();
        assert_eq!(joined, vec![("TLC", Some(1.0)), ("TLI", Some(2.0)), ("TLN", None)]);
        assert_eq!(features[0].name.as_deref(), Some("Region TLC"));
        assert!(features.iter().all(|f| f.in_parent && !f.selected));
        assert!(features.iter().all(|f| f.bbox.is_some()));
    }

    #[test]
    fn legacy_codes_are_remapped_before_lookup() {
        let mut def = definition(RegionLevel::Itl3, "ITL325CD");
        def.legacy_codes.insert("TLD11".to_string(), "TLD13".to_string());
        let geometry = LevelGeometry::new(RegionLevel::Itl3, vec![square("ITL325CD", "TLD11", 0.0, 0.0)]);
        let values = index(&[("TLD13", 5.0)]);

        let features = enrich(&geometry, RegionLevel::Itl3, &def, &values, None, None).unwrap();
        assert_eq!(features[0].code, "TLD13");
        assert_eq!(features[0].value, Some(5.0));
    }

    #[test]
    fn merged_districts_collapse_into_one_feature() {
        let mut def = definition(RegionLevel::Lad, "LAD24CD");
        def.legacy_codes.insert("E07000026".to_string(), "E06000063".to_string());
        def.legacy_codes.insert("E07000028".to_string(), "E06000063".to_string());
        let geometry = LevelGeometry::new(
            RegionLevel::Lad,
            vec![
                square("LAD24CD", "E07000026", -3.5, 54.5),
                square("LAD24CD", "E07000028", -3.0, 54.0),
                square("LAD24CD", "E06000001", -1.3, 54.6),
            ],
        );
        let values = index(&[("E06000063", 5.0), ("E06000001", 3.0)]);

        let features = enrich(&geometry, RegionLevel::Lad, &def, &values, None, None).unwrap();
        let codes: Vec<&str> = features.iter().map(|f| f.code.as_str()).collect();
        assert_eq!(codes, vec!["E06000063", "E06000001"]);

        let cumberland = &features[0];
        assert_eq!(cumberland.value, Some(5.0));
        assert_eq!(
            cumberland.bbox,
            Some(regioniq_region_models::BoundingBox::new(-3.5, 54.0, -2.0, 55.5))
        );
        let Some(Value::MultiPolygon(parts)) = cumberland.geometry.as_ref().map(|g| &g.value) else {
            panic!("expected a multipolygon");
        };
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn selection_accepts_datastore_codes() {
        let (geometry, def) = itl1();
        let features =
            enrich(&geometry, RegionLevel::Itl1, &def, &ValueIndex::new(), Some("E12000007"), None)
                .unwrap();
        let selected: Vec<&str> = features
            .iter()
            .filter(|f| f.selected)
            .map(|f| f.code.as_str())
            .collect();
        assert_eq!(selected, vec!["TLI"]);
    }

    #[test]
    fn mask_marks_in_parent() {
        let (geometry, def) = itl1();
        let mask = BTreeSet::from(["TLC".to_string(), "N92000002".to_string()]);
        let features =
            enrich(&geometry, RegionLevel::Itl1, &def, &ValueIndex::new(), None, Some(&mask))
                .unwrap();
        let in_parent: Vec<bool> = features.iter().map(|f| f.in_parent).collect();
        assert_eq!(in_parent, vec![true, false, true]);
    }

    #[test]
    fn features_without_code_are_skipped() {
        let (mut geometry, def) = itl1();
        geometry.features.push(square("OTHER", "X", 0.0, 0.0));
        let features =
            enrich(&geometry, RegionLevel::Itl1, &def, &ValueIndex::new(), None, None).unwrap();
        assert_eq!(features.len(), 3);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let (geometry, def) = itl1();
        let values = index(&[("TLC", 1.0), ("TLN", 3.5)]);
        let mask = BTreeSet::from(["TLC".to_string()]);
        let run = || {
            let features =
                enrich(&geometry, RegionLevel::Itl1, &def, &values, Some("TLN"), Some(&mask));
            serde_json::to_string(&features).unwrap()
        };
        assert_eq!(run(), run());
    }
}
