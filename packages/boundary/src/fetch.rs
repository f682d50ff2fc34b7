//! Boundary file fetching.
//!
//! A [`BoundarySource`] turns a [`LevelDefinition`] into the level's
//! geometry. The HTTP implementation tries the primary location first and
//! the fallback location once before giving up.

use std::future::Future;

use async_trait::async_trait;
use geojson::{FeatureCollection, GeoJson};
use regioniq_region_models::{LevelDefinition, RegionLevel, geometry::LevelGeometry};

use crate::BoundaryError;

/// Default base URL boundary paths are joined onto.
pub const DEFAULT_BOUNDARY_BASE_URL: &str = "http://localhost:3000";

/// Something that can produce the boundary geometry for a level.
#[async_trait]
pub trait BoundarySource: Send + Sync {
    /// Loads the boundary features for the level described by `def`.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the geometry cannot be loaded.
    async fn fetch(&self, def: &LevelDefinition) -> Result<LevelGeometry, BoundaryError>;
}

/// Fetches boundary files over HTTP with one fallback location.
#[derive(Debug, Clone)]
pub struct HttpBoundarySource {
    client: reqwest::Client,
    base_url: String,
    fallback_base_url: String,
}

impl HttpBoundarySource {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        fallback_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            fallback_base_url: fallback_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds a source from `BOUNDARY_BASE_URL` and
    /// `BOUNDARY_FALLBACK_BASE_URL`.
    ///
    /// The fallback base defaults to the primary base.
    #[must_use]
    pub fn from_env(client: reqwest::Client) -> Self {
        let base = std::env::var("BOUNDARY_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BOUNDARY_BASE_URL.to_string());
        let fallback = std::env::var("BOUNDARY_FALLBACK_BASE_URL").unwrap_or_else(|_| base.clone());
        Self::new(client, base, fallback)
    }

    /// Full primary and fallback URLs for a level.
    #[must_use]
    pub fn urls(&self, def: &LevelDefinition) -> (String, String) {
        (
            format!(
                "{}/{}",
                self.base_url,
                def.boundary_path.trim_start_matches('/')
            ),
            format!(
                "{}/{}",
                self.fallback_base_url,
                def.fallback_boundary_path.trim_start_matches('/')
            ),
        )
    }

    async fn fetch_body(&self, url: String) -> Result<String, BoundaryError> {
        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(BoundaryError::Conversion {
                message: format!("GeoJSON request to {url} failed with status {}", resp.status()),
            });
        }
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl BoundarySource for HttpBoundarySource {
    async fn fetch(&self, def: &LevelDefinition) -> Result<LevelGeometry, BoundaryError> {
        let (primary, fallback) = self.urls(def);
        fetch_with_fallback(def.level, &primary, &fallback, |url| self.fetch_body(url)).await
    }
}

/// Loads and parses `primary`, retrying once from `fallback` when the
/// download or the parse fails.
async fn fetch_with_fallback<F, Fut>(
    level: RegionLevel,
    primary: &str,
    fallback: &str,
    get: F,
) -> Result<LevelGeometry, BoundaryError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<String, BoundaryError>>,
{
    let first = get(primary.to_string()).await.and_then(|body| parse_level_geometry(level, &body));
    let e = match first {
        Ok(geometry) => return Ok(geometry),
        Err(e) => e,
    };
    log::warn!("{level} boundaries unavailable from {primary} ({e}), trying {fallback}");

    let body = get(fallback.to_string()).await.and_then(|body| parse_level_geometry(level, &body));
    if let Err(e) = &body {
        log::error!("{level} boundaries unavailable from {fallback} ({e})");
    }
    body
}

/// Parses a `GeoJSON` `FeatureCollection` body into level geometry.
///
/// # Errors
///
/// * [`BoundaryError::Json`] if the body is not JSON
/// * [`BoundaryError::Conversion`] if the JSON is not a `GeoJSON`
///   `FeatureCollection`
pub fn parse_level_geometry(level: RegionLevel, body: &str) -> Result<LevelGeometry, BoundaryError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let geojson = GeoJson::from_json_value(value).map_err(|e| BoundaryError::Conversion {
        message: format!("Failed to parse GeoJSON response: {e}"),
    })?;
    let collection =
        FeatureCollection::try_from(geojson).map_err(|e| BoundaryError::Conversion {
            message: format!("No FeatureCollection in GeoJSON response: {e}"),
        })?;
    Ok(LevelGeometry::new(level, collection.features))
}
