//! Region-code reconciliation tables.
//!
//! The economic datastore and the boundary files use independent code
//! schemes. The datastore keys ITL1 regions by ONS statistical codes
//! (`E12000001`, `S92000003`, ...) and the UK by `K02000001`; the ITL1
//! boundary file uses `TL?` group codes, the national boundary file an
//! ISO 3166-1 alpha-3 code, and older tooling the `UK?` NUTS codes.
//! Finer levels (ITL2, ITL3, LAD) share one scheme on both sides.

use crate::RegionLevel;

/// Datastore code for the United Kingdom.
pub const UK_DATASTORE_CODE: &str = "K02000001";

/// ISO 3166-1 alpha-3 code used by the national boundary file.
pub const UK_ISO_CODE: &str = "GBR";

/// Datastore ITL1 code for Northern Ireland.
pub const NI_DATASTORE_CODE: &str = "N92000002";

/// ITL2 code Northern Ireland rows carry in the NI employment series.
pub const NI_ITL2_CODE: &str = "TLN0";

/// ITL1 regions as `(datastore code, legacy UK code, boundary TL code)`.
pub const ITL1_CODES: &[(&str, &str, &str)] = &[
    ("E12000001", "UKC", "TLC"),
    ("E12000002", "UKD", "TLD"),
    ("E12000003", "UKE", "TLE"),
    ("E12000004", "UKF", "TLF"),
    ("E12000005", "UKG", "TLG"),
    ("E12000006", "UKH", "TLH"),
    ("E12000007", "UKI", "TLI"),
    ("E12000008", "UKJ", "TLJ"),
    ("E12000009", "UKK", "TLK"),
    ("W92000004", "UKL", "TLL"),
    ("S92000003", "UKM", "TLM"),
    ("N92000002", "UKN", "TLN"),
];

/// ITL1 region names by datastore code.
pub const ITL1_NAMES: &[(&str, &str)] = &[
    ("E12000001", "North East"),
    ("E12000002", "North West"),
    ("E12000003", "Yorkshire and The Humber"),
    ("E12000004", "East Midlands"),
    ("E12000005", "West Midlands"),
    ("E12000006", "East of England"),
    ("E12000007", "London"),
    ("E12000008", "South East"),
    ("E12000009", "South West"),
    ("W92000004", "Wales"),
    ("S92000003", "Scotland"),
    ("N92000002", "Northern Ireland"),
];

/// Name of an ITL1 region given its datastore code.
#[must_use]
pub fn itl1_name(code: &str) -> Option<&'static str> {
    ITL1_NAMES
        .iter()
        .find(|(db, _)| *db == code)
        .map(|(_, name)| *name)
}

/// Maps a datastore ITL1 code to its legacy `UK?` code.
#[must_use]
pub fn datastore_to_uk(code: &str) -> Option<&'static str> {
    ITL1_CODES
        .iter()
        .find(|(db, _, _)| *db == code)
        .map(|(_, uk, _)| *uk)
}

/// Maps a legacy `UK?` code to the datastore ITL1 code.
#[must_use]
pub fn uk_to_datastore(code: &str) -> Option<&'static str> {
    ITL1_CODES
        .iter()
        .find(|(_, uk, _)| uk.eq_ignore_ascii_case(code))
        .map(|(db, _, _)| *db)
}

/// Maps a datastore ITL1 code to the boundary file's `TL?` code.
#[must_use]
pub fn datastore_to_tl(code: &str) -> Option<&'static str> {
    ITL1_CODES
        .iter()
        .find(|(db, _, _)| *db == code)
        .map(|(_, _, tl)| *tl)
}

/// Maps a boundary `TL?` code to the datastore ITL1 code.
#[must_use]
pub fn tl_to_datastore(code: &str) -> Option<&'static str> {
    ITL1_CODES
        .iter()
        .find(|(_, _, tl)| tl.eq_ignore_ascii_case(code))
        .map(|(db, _, _)| *db)
}

/// Converts a datastore region code to the code used by `level`'s
/// boundary file.
///
/// Codes without a mapping pass through unchanged.
#[must_use]
pub fn to_boundary_code(level: RegionLevel, code: &str) -> String {
    match level {
        RegionLevel::National if code == UK_DATASTORE_CODE => UK_ISO_CODE.to_string(),
        RegionLevel::Itl1 => datastore_to_tl(code)
            .or_else(|| uk_to_datastore(code).and_then(datastore_to_tl))
            .map_or_else(|| code.to_string(), str::to_string),
        _ => code.to_string(),
    }
}

/// Converts a boundary-file (or legacy `UK?`) region code to the
/// datastore code for `level`.
///
/// Codes without a mapping pass through unchanged.
#[must_use]
pub fn to_datastore_code(level: RegionLevel, code: &str) -> String {
    match level {
        RegionLevel::National if code.eq_ignore_ascii_case(UK_ISO_CODE) => {
            UK_DATASTORE_CODE.to_string()
        }
        RegionLevel::Itl1 => tl_to_datastore(code)
            .or_else(|| uk_to_datastore(code))
            .map_or_else(|| code.to_string(), str::to_string),
        _ => code.to_string(),
    }
}

/// Infers the region level of a datastore code from its shape.
///
/// ITL1 codes are the nine English region codes plus the three
/// devolved-nation codes; `TL` codes are ITL2 when four characters long
/// and ITL3 otherwise; everything else is treated as a local authority.
#[must_use]
pub fn infer_level(db_code: &str) -> RegionLevel {
    if db_code == UK_DATASTORE_CODE {
        return RegionLevel::National;
    }
    if ["E120", "S920", "W920", "N920"]
        .iter()
        .any(|p| db_code.starts_with(p))
    {
        return RegionLevel::Itl1;
    }
    if db_code.starts_with("TL") {
        return if db_code.len() == 4 {
            RegionLevel::Itl2
        } else {
            RegionLevel::Itl3
        };
    }
    RegionLevel::Lad
}
