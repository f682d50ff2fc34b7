#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary geometry for every region level.
//!
//! Level definitions are TOML files embedded at compile time (see
//! [`registry`]). Geometry is downloaded as a `GeoJSON`
//! `FeatureCollection` from a primary location with one fallback
//! location ([`fetch`]), and kept for the rest of the session in a
//! per-level cache that shares in-flight downloads ([`cache`]).

pub mod cache;
pub mod fetch;
pub mod registry;

use thiserror::Error;

/// Errors that can occur while loading boundary geometry.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response was not a usable `GeoJSON` `FeatureCollection`.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
