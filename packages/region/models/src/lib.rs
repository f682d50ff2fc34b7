#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical geography types shared by the whole overlay pipeline.
//!
//! A [`RegionLevel`] decides which boundary file, which datastore table
//! and which feature property names apply. The per-level configuration
//! itself lives in [`LevelDefinition`] values loaded from the boundary
//! registry; the code reconciliation tables live in [`codes`] and the
//! level-tagged boundary geometry in [`geometry`].

pub mod codes;
pub mod geometry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// An administrative boundary level.
///
/// Ordered from coarsest to finest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RegionLevel {
    /// The whole United Kingdom as a single feature.
    #[serde(rename = "national")]
    #[strum(to_string = "national", serialize = "uk")]
    National,
    /// ITL1: nations and English regions.
    #[serde(rename = "ITL1")]
    #[strum(serialize = "ITL1")]
    Itl1,
    /// ITL2 sub-regions.
    #[serde(rename = "ITL2")]
    #[strum(serialize = "ITL2")]
    Itl2,
    /// ITL3 sub-regions.
    #[serde(rename = "ITL3")]
    #[strum(serialize = "ITL3")]
    Itl3,
    /// Local authority districts.
    #[serde(rename = "LAD")]
    #[strum(serialize = "LAD")]
    Lad,
}

impl RegionLevel {
    /// All levels, coarsest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::National, Self::Itl1, Self::Itl2, Self::Itl3, Self::Lad]
    }
}

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns `true` if all four coordinates are finite and lie within
    /// the standard longitude/latitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let lon_ok = |v: f64| v.is_finite() && (-180.0..=180.0).contains(&v);
        let lat_ok = |v: f64| v.is_finite() && (-90.0..=90.0).contains(&v);
        lon_ok(self.west) && lon_ok(self.east) && lat_ok(self.south) && lat_ok(self.north)
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }
}

/// Static configuration for one region level.
///
/// Deserialized from the embedded level registry TOML files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDefinition {
    /// The level this definition describes.
    pub level: RegionLevel,
    /// Datastore table holding this level's metric rows.
    pub table: String,
    /// Table queried when `table` returns no rows.
    #[serde(default)]
    pub fallback_table: Option<String>,
    /// Feature property holding the region code in the boundary file.
    pub code_property: String,
    /// Feature property holding the region name in the boundary file.
    pub name_property: String,
    /// Boundary file path, relative to the primary boundary base URL.
    pub boundary_path: String,
    /// Boundary file path, relative to the fallback boundary base URL.
    pub fallback_boundary_path: String,
    /// Boundary-file codes from an older vintage mapped to current codes.
    #[serde(default)]
    pub legacy_codes: BTreeMap<String, String>,
}

impl LevelDefinition {
    /// Applies this level's legacy-code remapping to a boundary code.
    #[must_use]
    pub fn resolve_code<'a>(&'a self, code: &'a str) -> &'a str {
        self.legacy_codes.get(code).map_or(code, String::as_str)
    }
}
