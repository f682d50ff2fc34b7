//! Datastore query shape.
//!
//! Every query is a row selection from one table, narrowed by metric id,
//! region code, period and data type. [`RowFilter::to_query_params`]
//! renders a filter as PostgREST query parameters.

use async_trait::async_trait;
use regioniq_metrics_models::MetricRow;

use crate::MetricsError;

/// Columns requested from the metric tables.
pub const SELECT_COLUMNS: &str = "region_code,region_name,region_level,metric_id,period,value,\
                                  ci_lower,ci_upper,unit,freq,data_type,data_quality,vintage";

/// Period narrowing for a row selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeriodFilter {
    /// Every period.
    #[default]
    Any,
    /// A single year.
    Exact(i32),
    /// An inclusive year range.
    Range {
        /// First year.
        from: i32,
        /// Last year.
        to: i32,
    },
}

/// A row selection over one metric table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    /// Metric ids to include (empty = all).
    pub metric_ids: Vec<String>,
    /// Region codes to include (empty = all).
    pub region_codes: Vec<String>,
    /// Period narrowing.
    pub period: PeriodFilter,
    /// Data types to include (empty = all).
    pub data_types: Vec<String>,
    /// PostgREST `order` clause.
    pub order: Option<String>,
    /// Rows to skip.
    pub offset: Option<usize>,
    /// Maximum rows to return.
    pub limit: Option<usize>,
}

impl RowFilter {
    /// Selection of one metric in one period.
    #[must_use]
    pub fn metric_period(metric_id: impl Into<String>, period: i32) -> Self {
        Self {
            metric_ids: vec![metric_id.into()],
            period: PeriodFilter::Exact(period),
            ..Self::default()
        }
    }

    /// Narrows the selection to a single region.
    #[must_use]
    pub fn with_region(mut self, region_code: impl Into<String>) -> Self {
        self.region_codes = vec![region_code.into()];
        self
    }

    /// Renders the filter as PostgREST query parameters.
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), SELECT_COLUMNS.to_string())];

        if let Some(p) = list_filter(&self.region_codes) {
            params.push(("region_code".to_string(), p));
        }
        if let Some(p) = list_filter(&self.metric_ids) {
            params.push(("metric_id".to_string(), p));
        }
        match self.period {
            PeriodFilter::Any => {}
            PeriodFilter::Exact(year) => params.push(("period".to_string(), format!("eq.{year}"))),
            PeriodFilter::Range { from, to } => {
                params.push(("period".to_string(), format!("gte.{from}")));
                params.push(("period".to_string(), format!("lte.{to}")));
            }
        }
        if let Some(p) = list_filter(&self.data_types) {
            params.push(("data_type".to_string(), p));
        }
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn list_filter(values: &[String]) -> Option<String> {
    match values {
        [] => None,
        [one] => Some(format!("eq.{one}")),
        many => Some(format!("in.({})", many.join(","))),
    }
}

/// A queryable metric datastore.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Selects the rows of `table` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the query fails or the response cannot
    /// be decoded.
    async fn select(&self, table: &str, filter: &RowFilter) -> Result<Vec<MetricRow>, MetricsError>;
}
