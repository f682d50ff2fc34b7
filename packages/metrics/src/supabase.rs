//! Supabase (PostgREST) implementation of [`MetricStore`].

use async_trait::async_trait;
use regioniq_metrics_models::MetricRow;

use crate::{
    MetricsError, retry,
    store::{MetricStore, RowFilter},
};

/// Read-only client for the Supabase REST API.
#[derive(Debug, Clone)]
pub struct SupabaseRestClient {
    client: reqwest::Client,
    url: String,
    anon_key: String,
}

impl SupabaseRestClient {
    /// Creates a client that authenticates with the anon key.
    #[must_use]
    pub fn new(client: reqwest::Client, url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    /// Builds a client from `SUPABASE_URL` and `SUPABASE_ANON_KEY`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Config`] if either variable is unset or
    /// empty.
    pub fn from_env(client: reqwest::Client) -> Result<Self, MetricsError> {
        let url = std::env::var("SUPABASE_URL").unwrap_or_default();
        let anon_key = std::env::var("SUPABASE_ANON_KEY").unwrap_or_default();
        if url.trim().is_empty() || anon_key.trim().is_empty() {
            return Err(MetricsError::Config {
                message: "SUPABASE_URL and SUPABASE_ANON_KEY must be set for Supabase REST access"
                    .to_string(),
            });
        }
        Ok(Self::new(client, url.trim(), anon_key.trim()))
    }

    /// Endpoint URL for `table`.
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url)
    }
}

#[async_trait]
impl MetricStore for SupabaseRestClient {
    async fn select(&self, table: &str, filter: &RowFilter) -> Result<Vec<MetricRow>, MetricsError> {
        let url = self.table_url(table);
        let params = filter.to_query_params();

        let body = retry::send_json(|| {
            self.client
                .get(&url)
                .header("apikey", &self.anon_key)
                .header("authorization", format!("Bearer {}", self.anon_key))
                .header("accept", "application/json")
                .query(&params)
        })
        .await?;

        if !body.is_array() {
            return Err(MetricsError::Query {
                message: format!("Expected an array of rows from {table}, got: {body}"),
            });
        }
        Ok(serde_json::from_value(body)?)
    }
}
