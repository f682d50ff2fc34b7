//! Observation query grammar.
//!
//! A query is a list of dimensions, each with an `item`, `all` or `range`
//! selection:
//!
//! ```json
//! {
//!   "query": [
//!     {"code": "metric", "selection": {"filter": "item", "values": ["population_total"]}},
//!     {"code": "region", "selection": {"filter": "item", "values": ["UKC", "TLC3"]}},
//!     {"code": "time_period", "selection": {"filter": "range", "from": "2020", "to": "2030"}}
//!   ]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Lifecycle;

/// Upper bound on estimated and returned records.
pub const MAX_RECORDS: u64 = 250_000;

/// Default record limit per response.
pub const DEFAULT_LIMIT: u64 = 50_000;

/// First year queried when no year range is given.
pub const MIN_YEAR: i32 = 1991;

/// Last year queried when no year range is given.
pub const MAX_YEAR: i32 = 2050;

/// Cost-estimate stand-ins for `all` selections.
const UNBOUNDED_METRICS: u64 = 5_000;
const UNBOUNDED_REGIONS: u64 = 50_000;
const UNBOUNDED_YEARS: u64 = 200;

/// Queryable dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimCode {
    Metric,
    Region,
    GeoSchema,
    Level,
    TimePeriod,
    Scenario,
    Measure,
    DataType,
    BreakdownType,
    BreakdownValue,
}

/// Selection over one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Selection {
    /// Explicit values.
    Item { values: Vec<String> },
    /// Every value.
    All,
    /// Inclusive range.
    Range { from: String, to: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDim {
    pub code: DimCode,
    pub selection: Selection,
}

/// What a query selects for one dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValues {
    /// The dimension was not mentioned.
    Unspecified,
    /// `all`.
    All,
    /// Item values, or `[from, to]` for a range.
    Values(Vec<String>),
}

impl DimValues {
    /// The selected values; empty for unspecified and `all`.
    #[must_use]
    pub fn values(&self) -> &[String] {
        match self {
            Self::Values(v) => v,
            Self::Unspecified | Self::All => &[],
        }
    }

    /// Number of values, counting an unspecified dimension as one.
    fn count(&self) -> u64 {
        u64::try_from(self.values().len()).unwrap_or(u64::MAX).max(1)
    }

    /// A two-element numeric selection read as an inclusive year range.
    #[must_use]
    pub fn year_range(&self) -> Option<(i32, i32)> {
        match self.values() {
            [from, to] if is_digits(from) && is_digits(to) => Some((from.parse().ok()?, to.parse().ok()?)),
            _ => None,
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Body of `POST /api/v1/observations/query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: Vec<QueryDim>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Offset of the first record, from a previous `next_cursor`.
    #[serde(default)]
    pub cursor: Option<u64>,
}

const fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl QueryRequest {
    /// What the query selects for `code`. The first mention wins.
    #[must_use]
    pub fn dim(&self, code: DimCode) -> DimValues {
        self.query
            .iter()
            .find(|d| d.code == code)
            .map_or(DimValues::Unspecified, |d| match &d.selection {
                Selection::Item { values } => DimValues::Values(values.clone()),
                Selection::All => DimValues::All,
                Selection::Range { from, to } => DimValues::Values(vec![from.clone(), to.clone()]),
            })
    }

    /// Upper estimate of the records this query could return.
    ///
    /// `all` selections count as very large so that unbounded queries are
    /// rejected before touching the datastore.
    #[must_use]
    pub fn estimate_cost(&self) -> u64 {
        let metrics = self.dim(DimCode::Metric);
        let regions = self.dim(DimCode::Region);
        let years = self.dim(DimCode::TimePeriod);

        let metric_count = if metrics == DimValues::All {
            UNBOUNDED_METRICS
        } else {
            metrics.count()
        };
        let region_count = if regions == DimValues::All {
            UNBOUNDED_REGIONS
        } else {
            regions.count()
        };
        let year_count = if years == DimValues::All {
            UNBOUNDED_YEARS
        } else if let Some((from, to)) = years.year_range() {
            u64::from(from.abs_diff(to)) + 1
        } else {
            years.count()
        };

        [
            metric_count,
            region_count,
            year_count,
            self.dim(DimCode::Scenario).count(),
            self.dim(DimCode::Measure).count(),
        ]
        .iter()
        .fold(1_u64, |acc, n| acc.saturating_mul(*n))
        .max(1)
    }

    /// Years to query: the selected range, or the full coverage.
    #[must_use]
    pub fn year_range(&self) -> (i32, i32) {
        self.dim(DimCode::TimePeriod)
            .year_range()
            .unwrap_or((MIN_YEAR, MAX_YEAR))
    }

    /// Maximum records to return.
    #[must_use]
    pub fn max_return(&self) -> u64 {
        self.limit.clamp(1, MAX_RECORDS)
    }
}

/// One output observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub metric_id: String,
    pub region_code: String,
    pub geo_schema: String,
    pub level: String,
    pub time_period: i32,
    pub scenario: String,
    pub measure: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub data_type: Option<String>,
    pub data_quality: Option<String>,
    pub confidence_lower: Option<f64>,
    pub confidence_upper: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    pub generated_at: DateTime<Utc>,
    pub estimated_records: u64,
    pub returned_records: u64,
    pub truncated: bool,
    pub warnings: Vec<String>,
    pub citation: String,
    pub url: String,
    pub accessed_at: DateTime<Utc>,
    pub next_cursor: Option<u64>,
}

/// Response for `POST /api/v1/observations/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub meta: ResponseMeta,
    pub data: Vec<ObservationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> QueryRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn parses_selections() {
        let req = request(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"item","values":["a","b"]}},
                {"code":"region","selection":{"filter":"all"}},
                {"code":"time_period","selection":{"filter":"range","from":"2020","to":"2030"}}
            ]}"#,
        );
        assert_eq!(req.limit, DEFAULT_LIMIT);
        assert_eq!(req.cursor, None);
        assert_eq!(
            req.dim(DimCode::Metric),
            DimValues::Values(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(req.dim(DimCode::Region), DimValues::All);
        assert_eq!(req.dim(DimCode::Scenario), DimValues::Unspecified);
        assert_eq!(req.year_range(), (2020, 2030));
    }

    #[test]
    fn cost_multiplies_dimensions() {
        let req = request(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"item","values":["a","b"]}},
                {"code":"region","selection":{"filter":"item","values":["UKC","UKD","UKE"]}},
                {"code":"time_period","selection":{"filter":"range","from":"2030","to":"2021"}},
                {"code":"scenario","selection":{"filter":"item","values":["baseline","upside"]}}
            ]}"#,
        );
        assert_eq!(req.estimate_cost(), 2 * 3 * 10 * 2);
    }

    #[test]
    fn unbounded_dimensions_are_expensive() {
        let req = request(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"all"}},
                {"code":"region","selection":{"filter":"item","values":["UKC"]}}
            ]}"#,
        );
        assert_eq!(req.estimate_cost(), 5_000);

        let req = request(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"item","values":["a"]}},
                {"code":"region","selection":{"filter":"all"}},
                {"code":"time_period","selection":{"filter":"all"}}
            ]}"#,
        );
        assert_eq!(req.estimate_cost(), 50_000 * 200);
        assert!(req.estimate_cost() > MAX_RECORDS);
    }

    #[test]
    fn missing_years_cover_everything() {
        let req = request(r#"{"query":[]}"#);
        assert_eq!(req.year_range(), (MIN_YEAR, MAX_YEAR));
        assert_eq!(req.estimate_cost(), 1);
    }

    #[test]
    fn limit_is_clamped() {
        let mut req = request(r#"{"query":[],"limit":0}"#);
        assert_eq!(req.max_return(), 1);
        req.limit = 10_000_000;
        assert_eq!(req.max_return(), MAX_RECORDS);
    }
}
