//! Metric rows to value index.

use regioniq_choropleth_models::ValueIndex;
use regioniq_metrics_models::{MetricRow, Scenario, select_value};
use regioniq_region_models::{RegionLevel, codes::to_boundary_code};

/// Builds the value index for `level` from `rows`.
///
/// Each row's scenario value is keyed by its code in the level's
/// boundary scheme. Rows with a null or non-finite value are dropped.
/// When two rows resolve to the same code, the later row wins.
#[must_use]
pub fn build_value_index(rows: &[MetricRow], level: RegionLevel, scenario: Scenario) -> ValueIndex {
    let mut index = ValueIndex::new();
    for row in rows {
        index.insert(
            to_boundary_code(level, &row.region_code),
            select_value(row, scenario),
        );
    }
    index
}
