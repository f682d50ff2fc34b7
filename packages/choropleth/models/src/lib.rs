#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth overlay types.
//!
//! These are the shapes produced by each pipeline stage and handed to the
//! map surface: the value index, the color domain, enriched boundary
//! features, the rank summary, and camera commands.

use std::collections::BTreeMap;

use geojson::{Feature, JsonObject, JsonValue, feature::Id};
use regioniq_region_models::{BoundingBox, RegionLevel};
use serde::{Deserialize, Serialize};

/// Region code (in the active level's boundary scheme) to display value.
///
/// Only finite values are ever stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueIndex(BTreeMap<String, f64>);

impl ValueIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `code` if it is finite.
    ///
    /// Returns `true` if the value was stored.
    pub fn insert(&mut self, code: impl Into<String>, value: Option<f64>) -> bool {
        match value {
            Some(v) if v.is_finite() => {
                self.0.insert(code.into(), v);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<f64> {
        self.0.get(code).copied()
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains_key(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// What the overlay shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum OverlayMode {
    /// The metric's value in the selected year.
    Absolute,
    /// Growth over the trailing `years` (YoY when 1, CAGR otherwise).
    Growth {
        /// Look-back period in years.
        years: u32,
    },
}

impl OverlayMode {
    #[must_use]
    pub const fn is_growth(self) -> bool {
        matches!(self, Self::Growth { .. })
    }
}

/// Color ramp family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RampKind {
    /// Low-to-high single-hue ramp.
    Sequential,
    /// Two-hue ramp around a zero midpoint.
    Diverging,
}

/// Range of values mapped onto the color ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorDomain {
    pub min: f64,
    pub max: f64,
    pub ramp: RampKind,
    /// Zero for diverging ramps.
    pub midpoint: Option<f64>,
}

/// A boundary feature joined with its display value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedFeature {
    /// Resolved region code; stable identity across re-renders.
    pub code: String,
    /// Region name from the boundary file.
    pub name: Option<String>,
    /// Display value, `None` when the region has no data.
    pub value: Option<f64>,
    /// Whether this is the selected region.
    pub selected: bool,
    /// Whether the region lies inside the active mask (always `true`
    /// when no mask is active).
    pub in_parent: bool,
    /// Extent of the feature's geometry.
    pub bbox: Option<BoundingBox>,
    /// Geometry, unchanged from the boundary file.
    pub geometry: Option<geojson::Geometry>,
    /// Original boundary-file properties.
    pub properties: JsonObject,
}

impl EnrichedFeature {
    /// Converts to a `GeoJSON` feature whose id is the resolved code.
    #[must_use]
    pub fn to_feature(&self) -> Feature {
        let mut properties = self.properties.clone();
        properties.insert("code".to_string(), JsonValue::from(self.code.clone()));
        properties.insert(
            "value".to_string(),
            self.value.map_or(JsonValue::Null, JsonValue::from),
        );
        properties.insert("selected".to_string(), JsonValue::from(self.selected));
        properties.insert("inParent".to_string(), JsonValue::from(self.in_parent));

        Feature {
            bbox: None,
            geometry: self.geometry.clone(),
            id: Some(Id::String(self.code.clone())),
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Rank summary for tooltip "Nth of M" displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySummary {
    pub level: RegionLevel,
    /// Features with a finite value.
    pub n: usize,
    /// All features, with or without data.
    pub total: usize,
    /// Median of the finite values.
    pub median: Option<f64>,
    /// 1 = highest value.
    pub rank_by_code: BTreeMap<String, usize>,
    pub value_by_code: BTreeMap<String, f64>,
}

impl OverlaySummary {
    /// Rank and field size for a region, e.g. `(3, 12)` for "3rd of 12".
    #[must_use]
    pub fn position(&self, code: &str) -> Option<(usize, usize)> {
        self.rank_by_code.get(code).map(|rank| (*rank, self.n))
    }
}

/// Why the camera moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FitReason {
    Selection,
    Focus,
    LevelExtent,
    DefaultExtent,
}

/// Viewport command for the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CameraCommand {
    /// Fit the viewport to a bounding box.
    FitBounds {
        bbox: BoundingBox,
        reason: FitReason,
    },
}

/// Output of the full pipeline for one level/metric/year/scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub level: RegionLevel,
    pub mode: OverlayMode,
    pub features: Vec<EnrichedFeature>,
    /// `None` when no feature has data.
    pub domain: Option<ColorDomain>,
    pub summary: OverlaySummary,
    /// Map paint expression for the fill color.
    pub paint: JsonValue,
}

impl Overlay {
    /// The enriched features as a `GeoJSON` `FeatureCollection`.
    #[must_use]
    pub fn feature_collection(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.features.iter().map(EnrichedFeature::to_feature).collect(),
            foreign_members: None,
        }
    }
}
