//! Embedded metric catalogue.
//!
//! The catalogue is the single place that says which metrics exist and
//! which of them get a sequential ramp in growth views. Metrics missing
//! from it are treated as able to shrink.

use std::sync::LazyLock;

use regioniq_metrics_models::MetricDefinition;
use serde::Deserialize;

/// Metric id of total employment.
pub const EMP_TOTAL_JOBS: &str = "emp_total_jobs";

/// Metric id under which Northern Ireland employment is stored.
pub const EMP_TOTAL_JOBS_NI: &str = "emp_total_jobs_ni";

#[derive(Deserialize)]
struct CatalogueFile {
    metric: Vec<MetricDefinition>,
}

static METRICS: LazyLock<Vec<MetricDefinition>> = LazyLock::new(|| {
    let file: CatalogueFile = toml::de::from_str(include_str!("../catalogue/metrics.toml"))
        .unwrap_or_else(|e| panic!("Failed to parse metric catalogue: {e}"));
    let mut metrics = file.metric;
    metrics.sort_by(|a, b| a.metric_id.cmp(&b.metric_id));
    metrics
});

/// Returns every catalogued metric, sorted by id.
///
/// # Panics
///
/// Panics if the embedded catalogue fails to parse, which the tests
/// below rule out.
#[must_use]
pub fn all_metrics() -> &'static [MetricDefinition] {
    &METRICS
}

/// Looks up a metric by id.
#[must_use]
pub fn metric(metric_id: &str) -> Option<&'static MetricDefinition> {
    all_metrics().iter().find(|m| m.metric_id == metric_id)
}

/// Whether growth in `metric_id` is displayed on a sequential ramp.
///
/// Unknown metrics return `false` (diverging ramp).
#[must_use]
pub fn growth_always_positive(metric_id: &str) -> bool {
    metric(metric_id).is_some_and(|m| m.growth_always_positive)
}
