//! Color domain selection.
//!
//! | Mode | Metric | Ramp | Domain |
//! |---|---|---|---|
//! | absolute | any | sequential | p05..p95, else raw |
//! | growth | always positive | sequential | p01..p99, else p05..p95, else raw |
//! | growth | signed | diverging | raw min..max |

use regioniq_choropleth_models::{ColorDomain, OverlayMode, RampKind};

use crate::quantile::{quantile_sorted, sorted_finite};

/// Computes the color domain for the visible values.
///
/// Returns `None` when there is no finite value, in which case every
/// region renders in the no-data color.
#[must_use]
pub fn compute_domain(values: &[f64], mode: OverlayMode, always_positive: bool) -> Option<ColorDomain> {
    let sorted = sorted_finite(values);
    let (raw_min, raw_max) = (*sorted.first()?, *sorted.last()?);
    let raw = (raw_min, raw_max);

    let (min, max, ramp) = match mode {
        OverlayMode::Absolute => {
            let (min, max) = first_spread(&sorted, &[0.05], raw);
            (min, max, RampKind::Sequential)
        }
        OverlayMode::Growth { .. } if always_positive => {
            let (min, max) = first_spread(&sorted, &[0.01, 0.05], raw);
            (min, max, RampKind::Sequential)
        }
        OverlayMode::Growth { .. } => (raw_min, raw_max, RampKind::Diverging),
    };

    Some(ColorDomain {
        min,
        max,
        ramp,
        midpoint: (ramp == RampKind::Diverging).then_some(0.0),
    })
}

/// The first `(p, 1 - p)` percentile pair with a positive spread, or the
/// raw extent if every pair degenerates.
fn first_spread(sorted: &[f64], tails: &[f64], raw: (f64, f64)) -> (f64, f64) {
    tails
        .iter()
        .filter_map(|p| Some((quantile_sorted(sorted, *p)?, quantile_sorted(sorted, 1.0 - p)?)))
        .find(|(lo, hi)| lo < hi)
        .unwrap_or(raw)
}
