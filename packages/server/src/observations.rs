//! Observation query execution.
//!
//! Region codes are grouped by the level their shape implies and each
//! level's table is queried in chunks of regions and metrics, paging
//! through results until the record limit is reached. Every row is
//! emitted once per requested scenario, valued with that scenario's
//! measure.

use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use regioniq_boundary::registry::level_definition;
use regioniq_metrics::{
    MetricsError,
    store::{MetricStore, PeriodFilter, RowFilter},
};
use regioniq_metrics_models::{Measure, MetricRow, Scenario, choose_measure};
use regioniq_region_models::{
    RegionLevel,
    codes::{datastore_to_uk, infer_level, to_datastore_code},
};
use regioniq_server_models::{
    ApiError,
    query::{DimCode, DimValues, MAX_RECORDS, ObservationRecord, QueryRequest},
};
use thiserror::Error;

/// Geography schema reported on every record.
pub const GEO_SCHEMA: &str = "UK_ITL_2025";

const REGION_CHUNK: usize = 100;
const METRIC_CHUNK: usize = 50;
const PAGE_SIZE: usize = 10_000;
const ORDER: &str = "metric_id.asc,region_code.asc,period.asc";

/// Errors that reject an observation query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The cost estimate exceeds [`MAX_RECORDS`].
    #[error("Query exceeds maximum estimated record limit.")]
    TooLarge {
        /// Estimated record count.
        estimated: u64,
    },

    /// `metric=all` or `region=all`.
    #[error(
        "metric=all and region=all are not allowed; provide explicit metric and region selections."
    )]
    Unbounded,

    /// The datastore query failed.
    #[error("Failed to query underlying data store.")]
    DataUnavailable {
        /// Table being queried.
        table: String,
        /// Underlying failure.
        #[source]
        source: MetricsError,
    },
}

impl QueryError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } | Self::Unbounded => StatusCode::BAD_REQUEST,
            Self::DataUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The error as a domain error payload.
    #[must_use]
    pub fn to_api_error(&self) -> ApiError {
        let message = self.to_string();
        match self {
            Self::TooLarge { estimated } => ApiError::new("QUERY_TOO_LARGE", message)
                .with_detail("estimated_records", *estimated)
                .with_detail("max_records", MAX_RECORDS),
            Self::Unbounded => ApiError::new("UNBOUNDED_QUERY", message)
                .with_detail("hint", "Use schema to enumerate values, then query a subset."),
            Self::DataUnavailable { table, source } => ApiError::new("DATA_UNAVAILABLE", message)
                .with_detail("table", table.as_str())
                .with_detail("reason", source.to_string()),
        }
    }
}

/// Records produced by a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub records: Vec<ObservationRecord>,
    pub estimated_records: u64,
    /// Whether the record limit cut the result short.
    pub truncated: bool,
    /// Cursor to continue from when truncated.
    pub next_cursor: Option<u64>,
}

/// Runs `req` against `store`.
///
/// # Errors
///
/// * [`QueryError::TooLarge`] if the cost estimate is over the limit
/// * [`QueryError::Unbounded`] if metrics or regions are `all`
/// * [`QueryError::DataUnavailable`] if any datastore query fails
pub async fn run_query(store: &dyn MetricStore, req: &QueryRequest) -> Result<QueryOutcome, QueryError> {
    let estimated_records = req.estimate_cost();
    if estimated_records > MAX_RECORDS {
        return Err(QueryError::TooLarge {
            estimated: estimated_records,
        });
    }

    let metrics = req.dim(DimCode::Metric);
    let regions = req.dim(DimCode::Region);
    if metrics == DimValues::All || regions == DimValues::All {
        return Err(QueryError::Unbounded);
    }

    let scenarios: Vec<String> = match req.dim(DimCode::Scenario).values() {
        [] => vec![Scenario::Baseline.to_string()],
        values => values.to_vec(),
    };
    let explicit_measure = req
        .dim(DimCode::Measure)
        .values()
        .first()
        .and_then(|m| m.parse::<Measure>().ok());
    let data_types = req.dim(DimCode::DataType).values().to_vec();
    let (from, to) = req.year_range();
    let cursor = req.cursor.unwrap_or(0);
    let max_return = usize::try_from(req.max_return()).unwrap_or(usize::MAX);

    let mut by_level: BTreeMap<RegionLevel, Vec<String>> = BTreeMap::new();
    for code in regions.values() {
        let db_code = to_datastore_code(RegionLevel::Itl1, code);
        by_level.entry(infer_level(&db_code)).or_default().push(db_code);
    }

    let mut records = Vec::new();
    'levels: for (level, codes) in &by_level {
        let table = &level_definition(*level).table;

        for region_chunk in codes.chunks(REGION_CHUNK) {
            for metric_chunk in metrics.values().chunks(METRIC_CHUNK) {
                let mut offset = usize::try_from(cursor).unwrap_or(usize::MAX);
                loop {
                    let filter = RowFilter {
                        metric_ids: metric_chunk.to_vec(),
                        region_codes: region_chunk.to_vec(),
                        period: PeriodFilter::Range { from, to },
                        data_types: data_types.clone(),
                        order: Some(ORDER.to_string()),
                        offset: Some(offset),
                        limit: Some(PAGE_SIZE.min(max_return - records.len())),
                    };
                    let rows = store.select(table, &filter).await.map_err(|source| {
                        QueryError::DataUnavailable {
                            table: table.clone(),
                            source,
                        }
                    })?;
                    if rows.is_empty() {
                        break;
                    }

                    for row in &rows {
                        for scenario in &scenarios {
                            records.push(record(row, *level, scenario, explicit_measure));
                            if records.len() >= max_return {
                                break 'levels;
                            }
                        }
                    }

                    offset += rows.len();
                    if rows.len() < PAGE_SIZE {
                        break;
                    }
                }
            }
        }
    }

    let truncated = records.len() >= max_return;
    let returned = u64::try_from(records.len()).unwrap_or(u64::MAX);
    Ok(QueryOutcome {
        records,
        estimated_records,
        truncated,
        next_cursor: truncated.then_some(cursor + returned),
    })
}

fn record(
    row: &MetricRow,
    level: RegionLevel,
    scenario: &str,
    explicit_measure: Option<Measure>,
) -> ObservationRecord {
    let measure = choose_measure(Scenario::parse_or_baseline(scenario), explicit_measure);

    ObservationRecord {
        metric_id: row.metric_id.clone().unwrap_or_default(),
        region_code: datastore_to_uk(&row.region_code)
            .map_or_else(|| row.region_code.clone(), str::to_string),
        geo_schema: GEO_SCHEMA.to_string(),
        level: level.to_string(),
        time_period: row.period.unwrap_or_default(),
        scenario: scenario.to_string(),
        measure: measure.to_string(),
        value: row.pick(measure),
        unit: row.unit.clone(),
        data_type: row.data_type.map(|d| d.as_ref().to_string()),
        data_quality: row.data_quality.clone(),
        confidence_lower: row.ci_lower,
        confidence_upper: row.ci_upper,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use regioniq_metrics_models::DataType;

    /// Returns one forecast row per region and metric in the filter,
    /// honouring offset and limit over that virtual result set.
    #[derive(Default)]
    struct EchoStore {
        calls: Mutex<Vec<(String, RowFilter)>>,
        fail: bool,
    }

    #[async_trait]
    impl MetricStore for EchoStore {
        async fn select(&self, table: &str, filter: &RowFilter) -> Result<Vec<MetricRow>, MetricsError> {
            self.calls
                .lock()
                .unwrap()
                .push((table.to_string(), filter.clone()));
            if self.fail {
                return Err(MetricsError::Query {
                    message: "HTTP 500".to_string(),
                });
            }
            let all: Vec<MetricRow> = filter
                .metric_ids
                .iter()
                .flat_map(|m| {
                    filter.region_codes.iter().map(move |r| {
                        let mut row = MetricRow::new(r.clone(), Some(100.0), DataType::Forecast)
                            .with_interval(Some(90.0), Some(110.0));
                        row.metric_id = Some(m.clone());
                        row.period = Some(2030);
                        row
                    })
                })
                .collect();
            Ok(all
                .into_iter()
                .skip(filter.offset.unwrap_or(0))
                .take(filter.limit.unwrap_or(usize::MAX))
                .collect())
        }
    }

    fn request(metrics: &[&str], regions: &[&str], extra: &str) -> QueryRequest {
        let json = format!(
            r#"{{"query":[
                {{"code":"metric","selection":{{"filter":"item","values":{metrics:?}}}}},
                {{"code":"region","selection":{{"filter":"item","values":{regions:?}}}}}
                {extra}
            ]}}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn uk_codes_round_trip_through_datastore_codes() {
        let store = EchoStore::default();
        let req = request(&["population_total"], &["UKC", "TLC31"], "");
        let out = run_query(&store, &req).await.unwrap();

        let calls = store.calls.lock().unwrap();
        let tables: Vec<&str> = calls.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tables, vec!["itl1_latest_all", "itl3_latest_all"]);
        assert_eq!(calls[0].1.region_codes, vec!["E12000001"]);
        assert_eq!(calls[0].1.period, PeriodFilter::Range { from: 1991, to: 2050 });

        let codes: Vec<(&str, &str)> = out
            .records
            .iter()
            .map(|r| (r.region_code.as_str(), r.level.as_str()))
            .collect();
        assert_eq!(codes, vec![("UKC", "ITL1"), ("TLC31", "ITL3")]);
        assert!(!out.truncated);
        assert_eq!(out.next_cursor, None);
    }

    #[tokio::test]
    async fn rows_repeat_per_scenario_with_its_measure() {
        let store = EchoStore::default();
        let req = request(
            &["emp_total_jobs"],
            &["E06000001"],
            r#",{"code":"scenario","selection":{"filter":"item","values":["baseline","downside","upside"]}}"#,
        );
        let out = run_query(&store, &req).await.unwrap();

        let picked: Vec<(&str, &str, Option<f64>)> = out
            .records
            .iter()
            .map(|r| (r.scenario.as_str(), r.measure.as_str(), r.value))
            .collect();
        assert_eq!(
            picked,
            vec![
                ("baseline", "value", Some(100.0)),
                ("downside", "ci_lower", Some(90.0)),
                ("upside", "ci_upper", Some(110.0)),
            ]
        );
        assert_eq!(out.records[0].data_type.as_deref(), Some("forecast"));
        assert_eq!(out.records[0].geo_schema, GEO_SCHEMA);
    }

    #[tokio::test]
    async fn explicit_measure_wins() {
        let store = EchoStore::default();
        let req = request(
            &["emp_total_jobs"],
            &["E06000001"],
            r#",{"code":"scenario","selection":{"filter":"item","values":["upside"]}},
               {"code":"measure","selection":{"filter":"item","values":["value"]}}"#,
        );
        let out = run_query(&store, &req).await.unwrap();
        assert_eq!(out.records[0].measure, "value");
        assert_eq!(out.records[0].value, Some(100.0));
    }

    #[tokio::test]
    async fn regions_are_chunked() {
        let store = EchoStore::default();
        let regions: Vec<String> = (0..150).map(|i| format!("E06{i:06}")).collect();
        let refs: Vec<&str> = regions.iter().map(String::as_str).collect();
        let req = request(&["population_total"], &refs, "");
        let out = run_query(&store, &req).await.unwrap();

        let calls = store.calls.lock().unwrap();
        let sizes: Vec<usize> = calls.iter().map(|(_, f)| f.region_codes.len()).collect();
        assert_eq!(sizes, vec![100, 50]);
        assert_eq!(out.records.len(), 150);
    }

    #[tokio::test]
    async fn limit_truncates_and_sets_cursor() {
        let store = EchoStore::default();
        let mut req = request(&["a", "b"], &["E06000001", "E06000002"], "");
        req.limit = 3;
        let out = run_query(&store, &req).await.unwrap();
        assert_eq!(out.records.len(), 3);
        assert!(out.truncated);
        assert_eq!(out.next_cursor, Some(3));
    }

    #[tokio::test]
    async fn unbounded_and_oversized_queries_are_rejected() {
        let store = EchoStore::default();
        let all_regions: QueryRequest = serde_json::from_str(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"item","values":["a"]}},
                {"code":"region","selection":{"filter":"all"}},
                {"code":"time_period","selection":{"filter":"all"}}
            ]}"#,
        )
        .unwrap();
        let err = run_query(&store, &all_regions).await.unwrap_err();
        assert!(matches!(err, QueryError::TooLarge { .. }));

        let all_metrics: QueryRequest = serde_json::from_str(
            r#"{"query":[
                {"code":"metric","selection":{"filter":"all"}},
                {"code":"region","selection":{"filter":"item","values":["UKC"]}}
            ]}"#,
        )
        .unwrap();
        let err = run_query(&store, &all_metrics).await.unwrap_err();
        assert!(matches!(err, QueryError::Unbounded));
        assert_eq!(err.to_api_error().error.code, "UNBOUNDED_QUERY");
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failures_are_data_unavailable() {
        let store = EchoStore {
            fail: true,
            ..EchoStore::default()
        };
        let req = request(&["a"], &["E06000001"], "");
        let err = run_query(&store, &req).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let api = err.to_api_error();
        assert_eq!(api.error.code, "DATA_UNAVAILABLE");
        assert_eq!(api.error.details["table"], "lad_latest_all");
    }
}
