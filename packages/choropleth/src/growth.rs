//! Growth over a look-back period.
//!
//! One-year growth is a plain percentage change; longer periods use the
//! compound annual growth rate. Both are percentages.

use std::collections::BTreeMap;

use regioniq_choropleth_models::ValueIndex;
use regioniq_metrics_models::{MetricRow, Scenario, select_value};
use regioniq_region_models::{RegionLevel, codes::to_boundary_code};

/// Compound annual growth rate in percent.
///
/// Returns `0.0` when `past <= 0` or `years == 0`.
#[must_use]
pub fn cagr(current: f64, past: f64, years: u32) -> f64 {
    if past <= 0.0 || years == 0 {
        return 0.0;
    }
    ((current / past).powf(1.0 / f64::from(years)) - 1.0) * 100.0
}

/// Growth from `past` to `current` over `years`, in percent.
///
/// `None` when either value is missing or `past` is not strictly
/// positive; such regions have no growth figure at all.
#[must_use]
pub fn compute_growth(current: Option<f64>, past: Option<f64>, years: u32) -> Option<f64> {
    let (current, past) = (current?, past?);
    if past <= 0.0 || !past.is_finite() || !current.is_finite() {
        return None;
    }
    let growth = if years == 1 {
        ((current - past) / past) * 100.0
    } else {
        cagr(current, past, years)
    };
    growth.is_finite().then_some(growth)
}

/// Builds a growth value index from current- and past-period rows.
///
/// The scenario selector is applied to both row sets before the growth
/// is computed. Regions without a positive past value are left out.
#[must_use]
pub fn build_growth_index(
    current: &[MetricRow],
    past: &[MetricRow],
    level: RegionLevel,
    scenario: Scenario,
    years: u32,
) -> ValueIndex {
    let past_by_code: BTreeMap<&str, Option<f64>> = past
        .iter()
        .map(|row| (row.region_code.as_str(), select_value(row, scenario)))
        .collect();

    let mut index = ValueIndex::new();
    for row in current {
        let Some(past_value) = past_by_code.get(row.region_code.as_str()) else {
            continue;
        };
        let growth = compute_growth(select_value(row, scenario), *past_value, years);
        index.insert(to_boundary_code(level, &row.region_code), growth);
    }
    index
}
