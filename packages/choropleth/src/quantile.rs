//! Interpolated quantiles (the "type 7" estimator).

/// Quantile `p` of an ascending slice.
///
/// The position is `(n - 1) * p`, linearly interpolated between the
/// neighbouring order statistics. `p` is clamped to `[0, 1]`.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let (first, last) = (sorted.first()?, sorted.last()?);
    if sorted.len() == 1 {
        return Some(*first);
    }

    let p = p.clamp(0.0, 1.0);
    #[allow(clippy::cast_precision_loss)]
    let pos = (sorted.len() - 1) as f64 * p;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    if lo >= sorted.len() - 1 {
        return Some(*last);
    }

    #[allow(clippy::cast_precision_loss)]
    let frac = pos - lo as f64;
    Some(sorted[lo].mul_add(1.0 - frac, sorted[hi] * frac))
}

/// Sorts the finite values of `values` ascending.
#[must_use]
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantile `p` of the finite values in `values`, in any order.
#[must_use]
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    quantile_sorted(&sorted_finite(values), p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_has_no_quantile() {
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&[f64::NAN], 0.5), None);
    }

    #[test]
    fn single_value() {
        assert_eq!(quantile(&[4.0], 0.05), Some(4.0));
        assert_eq!(quantile(&[4.0], 0.95), Some(4.0));
    }

    #[test]
    fn interpolates_between_order_statistics() {
        let values: Vec<f64> = (1..=100).map(f64::from).collect();
        assert!(close(quantile(&values, 0.05).unwrap(), 5.95));
        assert!(close(quantile(&values, 0.95).unwrap(), 95.05));
        assert!(close(quantile(&values, 0.5).unwrap(), 50.5));
        assert!(close(quantile(&values, 0.0).unwrap(), 1.0));
        assert!(close(quantile(&values, 1.0).unwrap(), 100.0));
    }

    #[test]
    fn odd_median_is_middle_value() {
        assert_eq!(quantile(&[5.0, 1.0, 3.0], 0.5), Some(3.0));
    }

    #[test]
    fn ignores_non_finite() {
        assert_eq!(quantile(&[1.0, f64::INFINITY, 3.0, f64::NAN], 0.5), Some(2.0));
    }
}
