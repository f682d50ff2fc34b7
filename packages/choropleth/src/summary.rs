//! Rank and median summary.

use std::collections::BTreeMap;

use regioniq_choropleth_models::{EnrichedFeature, OverlaySummary};
use regioniq_region_models::RegionLevel;

use crate::quantile::quantile;

/// Ranks the features with data, highest value first.
///
/// Equal values keep their input order, so the first-seen feature gets
/// the better rank.
#[must_use]
pub fn summarize(features: &[EnrichedFeature], level: RegionLevel) -> OverlaySummary {
    let mut with_data: Vec<(&str, f64)> = features
        .iter()
        .filter_map(|f| f.value.filter(|v| v.is_finite()).map(|v| (f.code.as_str(), v)))
        .collect();
    with_data.sort_by(|a, b| b.1.total_cmp(&a.1));

    let values: Vec<f64> = with_data.iter().map(|(_, v)| *v).collect();
    let mut rank_by_code = BTreeMap::new();
    let mut value_by_code = BTreeMap::new();
    for (i, (code, value)) in with_data.iter().enumerate() {
        rank_by_code.entry((*code).to_string()).or_insert(i + 1);
        value_by_code.entry((*code).to_string()).or_insert(*value);
    }

    OverlaySummary {
        level,
        n: with_data.len(),
        total: features.len(),
        median: quantile(&values, 0.5),
        rank_by_code,
        value_by_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::JsonObject;

    fn feature(code: &str, value: Option<f64>) -> EnrichedFeature {
        EnrichedFeature {
            code: code.to_string(),
            name: None,
            value,
            selected: false,
            in_parent: true,
            bbox: None,
            geometry: None,
            properties: JsonObject::new(),
        }
    }

    #[test]
    fn ranks_highest_first() {
        let features = vec![
            feature("A", Some(3.0)),
            feature("B", Some(9.0)),
            feature("C", Some(1.0)),
            feature("D", Some(5.0)),
            feature("E", Some(7.0)),
        ];
        let s = summarize(&features, RegionLevel::Itl1);
        assert_eq!(s.rank_by_code["B"], 1);
        assert_eq!(s.rank_by_code["C"], 5);
        assert_eq!(s.median, Some(5.0));
        assert_eq!(s.n, 5);
        assert_eq!(s.total, 5);
        assert_eq!(s.value_by_code["E"], 7.0);
    }

    #[test]
    fn missing_values_count_toward_total_only() {
        let features = vec![
            feature("A", Some(2.0)),
            feature("B", None),
            feature("C", Some(f64::NAN)),
        ];
        let s = summarize(&features, RegionLevel::Lad);
        assert_eq!(s.n, 1);
        assert_eq!(s.total, 3);
        assert!(!s.rank_by_code.contains_key("B"));
        assert!(!s.rank_by_code.contains_key("C"));
    }

    #[test]
    fn ties_keep_input_order() {
        let features = vec![
            feature("X", Some(4.0)),
            feature("Y", Some(4.0)),
            feature("Z", Some(1.0)),
        ];
        let s = summarize(&features, RegionLevel::Itl2);
        assert_eq!(s.rank_by_code["X"], 1);
        assert_eq!(s.rank_by_code["Y"], 2);
    }

    #[test]
    fn empty_has_no_median() {
        let s = summarize(&[feature("A", None)], RegionLevel::Itl3);
        assert_eq!(s.n, 0);
        assert_eq!(s.median, None);
    }
}
