#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Choropleth overlay pipeline.
//!
//! Each stage is a pure function and can be used on its own:
//!
//! ```text
//! rows -> value index -> enriched features -> color domain -> summary
//! ```
//!
//! [`build_overlay`] runs the whole chain for one level. Camera fitting
//! lives in [`camera`] because it carries state between runs.

pub mod camera;
pub mod domain;
pub mod enrich;
pub mod growth;
pub mod index;
pub mod quantile;
pub mod ramp;
pub mod summary;

use std::collections::BTreeSet;

use regioniq_choropleth_models::{Overlay, OverlayMode, ValueIndex};
use regioniq_metrics_models::{MetricRow, Scenario};
use regioniq_region_models::{LevelDefinition, RegionLevel, geometry::LevelGeometry};

/// What to draw, independent of the fetched data.
#[derive(Debug, Clone, Copy)]
pub struct OverlayParams<'a> {
    pub level: RegionLevel,
    pub scenario: Scenario,
    pub mode: OverlayMode,
    /// Whether the metric's growth never goes negative.
    pub always_positive: bool,
    pub selected: Option<&'a str>,
    pub mask: Option<&'a BTreeSet<String>>,
}

/// Value index for `params`: raw values, or growth from `past` rows.
#[must_use]
pub fn value_index(params: &OverlayParams<'_>, current: &[MetricRow], past: &[MetricRow]) -> ValueIndex {
    match params.mode {
        OverlayMode::Absolute => index::build_value_index(current, params.level, params.scenario),
        OverlayMode::Growth { years } => {
            growth::build_growth_index(current, past, params.level, params.scenario, years)
        }
    }
}

/// Runs the full pipeline.
///
/// `past` is only read in growth mode. Returns `None` if `geometry` or
/// `def` belongs to a different level than `params.level`.
#[must_use]
pub fn build_overlay(
    geometry: &LevelGeometry,
    def: &LevelDefinition,
    params: &OverlayParams<'_>,
    current: &[MetricRow],
    past: &[MetricRow],
) -> Option<Overlay> {
    let index = value_index(params, current, past);
    let features = enrich::enrich(
        geometry,
        params.level,
        def,
        &index,
        params.selected,
        params.mask,
    )?;

    let visible: Vec<f64> = features.iter().filter_map(|f| f.value).collect();
    let domain = domain::compute_domain(&visible, params.mode, params.always_positive);
    let summary = summary::summarize(&features, params.level);
    log::debug!(
        "Built {} overlay: {}/{} features with data, domain {domain:?}",
        params.level,
        summary.n,
        summary.total
    );

    Some(Overlay {
        level: params.level,
        mode: params.mode,
        paint: ramp::paint_expression(domain.as_ref()),
        domain,
        summary,
        features,
    })
}
