#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric observation types and scenario selection.
//!
//! A [`MetricRow`] is one (region, period) observation as stored in the
//! datastore. Forecast rows carry a confidence interval whose bounds stand
//! in for the downside and upside scenarios; historical rows only ever
//! expose their observed value.

use regioniq_region_models::RegionLevel;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Whether a row was observed or projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataType {
    /// Observed data.
    Historical,
    /// Model projection.
    Forecast,
    /// Any other label the datastore may carry.
    #[serde(other)]
    Other,
}

/// A named forecast variant.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Scenario {
    /// Central projection.
    #[default]
    Baseline,
    /// Upper confidence bound.
    Upside,
    /// Lower confidence bound.
    Downside,
}

impl Scenario {
    /// All scenarios in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Baseline, Self::Upside, Self::Downside]
    }

    /// Parses a scenario name, treating anything unrecognised as
    /// [`Scenario::Baseline`].
    #[must_use]
    pub fn parse_or_baseline(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }

    /// The row column representing this scenario on forecast rows.
    #[must_use]
    pub const fn measure(self) -> Measure {
        match self {
            Self::Baseline => Measure::Value,
            Self::Upside => Measure::CiUpper,
            Self::Downside => Measure::CiLower,
        }
    }
}

/// A numeric column of a [`MetricRow`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    /// Central value.
    Value,
    /// Lower confidence bound.
    CiLower,
    /// Upper confidence bound.
    CiUpper,
}

/// One (region, period) observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Region code in the datastore's scheme for the row's level.
    pub region_code: String,
    /// Region name, when the table carries one.
    #[serde(default)]
    pub region_name: Option<String>,
    /// Metric identifier.
    #[serde(default)]
    pub metric_id: Option<String>,
    /// Observation year.
    #[serde(default)]
    pub period: Option<i32>,
    /// Central value.
    #[serde(default)]
    pub value: Option<f64>,
    /// Lower confidence bound (forecast rows only).
    #[serde(default)]
    pub ci_lower: Option<f64>,
    /// Upper confidence bound (forecast rows only).
    #[serde(default)]
    pub ci_upper: Option<f64>,
    /// Observed or projected.
    #[serde(default)]
    pub data_type: Option<DataType>,
    /// Unit label.
    #[serde(default)]
    pub unit: Option<String>,
    /// Data quality label.
    #[serde(default)]
    pub data_quality: Option<String>,
}

impl MetricRow {
    /// Creates a row with only the fields the overlay pipeline reads.
    #[must_use]
    pub fn new(region_code: impl Into<String>, value: Option<f64>, data_type: DataType) -> Self {
        Self {
            region_code: region_code.into(),
            region_name: None,
            metric_id: None,
            period: None,
            value,
            ci_lower: None,
            ci_upper: None,
            data_type: Some(data_type),
            unit: None,
            data_quality: None,
        }
    }

    /// Sets the confidence interval bounds.
    #[must_use]
    pub const fn with_interval(mut self, ci_lower: Option<f64>, ci_upper: Option<f64>) -> Self {
        self.ci_lower = ci_lower;
        self.ci_upper = ci_upper;
        self
    }

    #[must_use]
    pub fn is_historical(&self) -> bool {
        self.data_type == Some(DataType::Historical)
    }

    /// Reads `measure`, falling back to `value` when the bound is absent.
    ///
    /// Historical rows always return `value`.
    #[must_use]
    pub fn pick(&self, measure: Measure) -> Option<f64> {
        if self.is_historical() {
            return self.value;
        }
        match measure {
            Measure::Value => self.value,
            Measure::CiLower => self.ci_lower.or(self.value),
            Measure::CiUpper => self.ci_upper.or(self.value),
        }
    }
}

/// The number representing `row` under `scenario`.
#[must_use]
pub fn select_value(row: &MetricRow, scenario: Scenario) -> Option<f64> {
    row.pick(scenario.measure())
}

/// Chooses the column to report for `scenario`; an explicit measure wins.
#[must_use]
pub fn choose_measure(scenario: Scenario, explicit: Option<Measure>) -> Measure {
    explicit.unwrap_or_else(|| scenario.measure())
}

/// Composite cache key for one metric-row fetch.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    pub level: RegionLevel,
    pub metric_id: String,
    pub year: i32,
    pub scenario: Scenario,
}

impl MetricKey {
    #[must_use]
    pub fn new(level: RegionLevel, metric_id: impl Into<String>, year: i32, scenario: Scenario) -> Self {
        Self {
            level,
            metric_id: metric_id.into(),
            year,
            scenario,
        }
    }

    /// The same key moved back `years` periods, saturating at
    /// [`i32::MIN`].
    #[must_use]
    pub fn years_back(&self, years: u32) -> Self {
        Self {
            year: self.year.saturating_sub(i32::try_from(years).unwrap_or(i32::MAX)),
            ..self.clone()
        }
    }
}

/// Catalogue entry describing a metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    /// Datastore metric identifier.
    #[serde(alias = "metric_id")]
    pub metric_id: String,
    /// Display name.
    pub name: String,
    /// Unit label (e.g. `"£m"`, `"jobs"`).
    pub unit: String,
    /// Metric kind (currently always `"level"`).
    pub kind: String,
    /// `"count"` or `"nominal"`.
    pub scale: String,
    /// Whether growth in this metric is shown on a sequential ramp
    /// rather than a diverging one.
    #[serde(default, alias = "growth_always_positive")]
    pub growth_always_positive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(value: Option<f64>, lo: Option<f64>, hi: Option<f64>) -> MetricRow {
        MetricRow::new("TLC", value, DataType::Forecast).with_interval(lo, hi)
    }

    #[test]
    fn historical_rows_ignore_scenario() {
        let row = MetricRow::new("E12000001", Some(100.0), DataType::Historical)
            .with_interval(Some(90.0), Some(110.0));
        for scenario in Scenario::all() {
            assert_eq!(select_value(&row, *scenario), Some(100.0));
        }
    }

    #[test]
    fn historical_null_value_stays_null() {
        let row = MetricRow::new("E12000001", None, DataType::Historical)
            .with_interval(Some(90.0), Some(110.0));
        assert_eq!(select_value(&row, Scenario::Downside), None);
        assert_eq!(select_value(&row, Scenario::Upside), None);
    }

    #[test]
    fn forecast_rows_follow_scenario() {
        let row = forecast(Some(100.0), Some(90.0), Some(110.0));
        assert_eq!(select_value(&row, Scenario::Baseline), Some(100.0));
        assert_eq!(select_value(&row, Scenario::Downside), Some(90.0));
        assert_eq!(select_value(&row, Scenario::Upside), Some(110.0));
    }

    #[test]
    fn missing_bounds_fall_back_to_value() {
        let row = forecast(Some(100.0), None, None);
        assert_eq!(select_value(&row, Scenario::Downside), Some(100.0));
        assert_eq!(select_value(&row, Scenario::Upside), Some(100.0));
    }

    #[test]
    fn untyped_rows_follow_scenario() {
        let mut row = forecast(Some(100.0), Some(90.0), Some(110.0));
        row.data_type = None;
        assert_eq!(select_value(&row, Scenario::Downside), Some(90.0));
    }

    #[test]
    fn unknown_scenario_is_baseline() {
        assert_eq!(Scenario::parse_or_baseline("stress"), Scenario::Baseline);
        assert_eq!(Scenario::parse_or_baseline("Upside"), Scenario::Upside);
        assert_eq!(Scenario::parse_or_baseline(" downside "), Scenario::Downside);
    }

    #[test]
    fn explicit_measure_wins() {
        assert_eq!(choose_measure(Scenario::Upside, None), Measure::CiUpper);
        assert_eq!(
            choose_measure(Scenario::Upside, Some(Measure::Value)),
            Measure::Value
        );
    }

    #[test]
    fn deserializes_datastore_row() {
        let row: MetricRow = serde_json::from_str(
            r#"{
                "region_code": "E12000007",
                "region_name": "London",
                "metric_id": "emp_total_jobs",
                "period": 2023,
                "value": 6100000.0,
                "ci_lower": null,
                "ci_upper": null,
                "data_type": "historical",
                "vintage": "2026-W03"
            }"#,
        )
        .unwrap();
        assert!(row.is_historical());
        assert_eq!(row.period, Some(2023));
        assert_eq!(row.value, Some(6_100_000.0));

        let odd: MetricRow =
            serde_json::from_str(r#"{ "region_code": "TLC", "data_type": "nowcast" }"#).unwrap();
        assert_eq!(odd.data_type, Some(DataType::Other));
    }

    #[test]
    fn key_years_back() {
        let key = MetricKey::new(RegionLevel::Itl1, "emp_total_jobs", 2024, Scenario::Baseline);
        let past = key.years_back(5);
        assert_eq!(past.year, 2019);
        assert_eq!(past.metric_id, "emp_total_jobs");
        assert_ne!(key, past);
    }

    #[test]
    fn years_back_saturates() {
        let key = MetricKey::new(RegionLevel::Itl1, "emp_total_jobs", -2, Scenario::Baseline);
        assert_eq!(key.years_back(u32::MAX).year, i32::MIN);

        let key = MetricKey::new(RegionLevel::Itl1, "emp_total_jobs", 2024, Scenario::Baseline);
        assert_eq!(key.years_back(u32::MAX).year, 2024 - i32::MAX);
    }
}
