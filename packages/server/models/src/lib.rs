#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the `RegionIQ` server.
//!
//! These types are serialized to JSON for the REST API. Overlay types use
//! camelCase; the observations query grammar and schema keep the
//! snake_case field names of the public data API.

pub mod query;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use geojson::{FeatureCollection, JsonObject, JsonValue};
use regioniq_choropleth_models::{CameraCommand, ColorDomain, OverlayMode, OverlaySummary};
use regioniq_metrics_models::{MetricDefinition, Scenario};
use regioniq_region_models::RegionLevel;
use serde::{Deserialize, Serialize};

/// Response for `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    pub healthy: bool,
    pub version: String,
}

/// Response for `GET /api/version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiVersion {
    pub service: String,
    pub api_version: String,
    /// Release-controlled forecast vintage, e.g. `2026-W03`.
    pub forecast_vintage: String,
    /// Build identifier (git SHA).
    pub build: String,
    pub env: String,
}

/// Publication status of the served data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Final,
    Provisional,
    Experimental,
}

/// Provenance attached to schema and query responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lifecycle {
    pub vintage: String,
    pub source: String,
    pub status: DataStatus,
}

/// Body of every domain error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorPayload {
    /// Machine-readable code, e.g. `QUERY_TOO_LARGE`.
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: JsonObject,
}

/// Domain error response: `{"error": {"code", "message", "details"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorPayload,
}

impl ApiError {
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorPayload {
                code: code.into(),
                message: message.into(),
                details: JsonObject::new(),
            },
        }
    }

    /// Adds a `details` entry.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.error.details.insert(key.to_string(), value.into());
        self
    }
}

/// A region in the schema catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRegion {
    pub region_code: String,
    pub region_name: String,
    pub level: RegionLevel,
    pub geo_schema: String,
    pub parent_region_code: Option<String>,
    pub valid_from: String,
    pub valid_to: Option<String>,
}

/// A level in the schema catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiLevel {
    pub level: RegionLevel,
    pub table: String,
    pub code_property: String,
    pub name_property: String,
}

/// Years covered by the datastore.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeCoverage {
    pub min_year: i32,
    pub max_year: i32,
}

/// Response for `GET /api/schema`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSchema {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub metrics: Vec<MetricDefinition>,
    pub regions: Vec<ApiRegion>,
    pub levels: Vec<ApiLevel>,
    pub scenarios: Vec<Scenario>,
    pub measures: Vec<String>,
    pub time_coverage: TimeCoverage,
}

/// Query parameters for `GET /api/overlay`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayQueryParams {
    /// Region level, e.g. `ITL1` or `lad`.
    pub level: String,
    /// Metric identifier.
    pub metric: String,
    pub year: i32,
    /// `baseline`, `upside` or `downside`; anything else is baseline.
    pub scenario: Option<String>,
    /// Growth look-back in years; absolute values when absent or zero.
    pub growth_years: Option<u32>,
    /// Selected region code.
    pub selected: Option<String>,
    /// Region to fit the camera to once.
    pub focus: Option<String>,
    /// Comma-separated region codes inside the active parent.
    pub mask: Option<String>,
    /// Session id; requests sharing one supersede each other.
    pub session: Option<String>,
}

impl OverlayQueryParams {
    /// The overlay mode these parameters ask for.
    #[must_use]
    pub fn mode(&self) -> OverlayMode {
        match self.growth_years {
            Some(years) if years > 0 => OverlayMode::Growth { years },
            _ => OverlayMode::Absolute,
        }
    }

    /// The mask as a set, if one was given.
    #[must_use]
    pub fn mask_codes(&self) -> Option<BTreeSet<String>> {
        self.mask.as_deref().map(|m| {
            m.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Response for `GET /api/overlay`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOverlay {
    /// Session the request ran in, if it named one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub level: RegionLevel,
    pub metric: String,
    pub year: i32,
    pub scenario: Scenario,
    pub mode: OverlayMode,
    pub features: FeatureCollection,
    pub domain: Option<ColorDomain>,
    pub paint: JsonValue,
    pub summary: OverlaySummary,
    pub camera: Option<CameraCommand>,
}
