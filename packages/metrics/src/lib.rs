#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metric datastore access.
//!
//! The datastore is a hosted Postgres exposed through a PostgREST API.
//! [`store::MetricStore`] abstracts the query shape, [`supabase`] is the
//! HTTP implementation, and [`fetcher::MetricFetcher`] memoizes overlay
//! fetches per (level, metric, year, scenario) and folds in the Northern
//! Ireland employment series.

pub mod catalogue;
pub mod fetcher;
pub mod retry;
pub mod store;
pub mod supabase;

use thiserror::Error;

/// Errors that can occur while talking to the metric datastore.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Required configuration is missing.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what is missing.
        message: String,
    },

    /// The datastore answered with an error or an unexpected shape.
    #[error("Query error: {message}")]
    Query {
        /// Description of what went wrong.
        message: String,
    },
}
