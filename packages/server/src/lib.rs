#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for `RegionIQ`.
//!
//! Serves choropleth overlays for the map surface and the public
//! observations query API. Metric rows come from the Supabase REST
//! datastore and boundary geometry from the configured boundary hosts;
//! both are cached for the lifetime of the process.

mod handlers;
pub mod observations;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, error::InternalError, middleware, web};
use regioniq_boundary::{
    cache::GeometryCache,
    fetch::{BoundarySource, HttpBoundarySource},
    registry::all_levels,
};
use regioniq_metrics::{
    MetricsError,
    fetcher::{MetricFetcher, MetricRowCache},
    store::MetricStore,
    supabase::SupabaseRestClient,
};
use regioniq_overlay::OverlayController;
use regioniq_server_models::{ApiError, DataStatus, Lifecycle};

/// Source named in lifecycle metadata and citations.
pub const DATA_SOURCE: &str = "RegionIQ Forecast Engine v1";

/// Overlay sessions kept at once.
const MAX_SESSIONS: usize = 1024;

/// Delay before boundary prefetching starts.
const PREFETCH_DELAY: Duration = Duration::from_secs(2);

/// Release metadata read from the environment.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// `FORECAST_VINTAGE`, default `unreleased`.
    pub forecast_vintage: String,
    /// `GIT_SHA`, default `dev`.
    pub git_sha: String,
    /// `ENV`, default `development`.
    pub env: String,
}

impl BuildInfo {
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };
        Self {
            forecast_vintage: var("FORECAST_VINTAGE", "unreleased"),
            git_sha: var("GIT_SHA", "dev"),
            env: var("ENV", "development"),
        }
    }

    /// Provenance attached to schema and query responses.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle {
            vintage: self.forecast_vintage.clone(),
            source: DATA_SOURCE.to_string(),
            status: DataStatus::Provisional,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Metric datastore, used directly by observation queries.
    pub store: Arc<dyn MetricStore>,
    /// Memoizing row fetcher shared by every overlay session.
    pub fetcher: Arc<MetricFetcher<dyn MetricStore>>,
    /// Boundary geometry shared by every overlay session.
    pub geometry: Arc<GeometryCache<dyn BoundarySource>>,
    pub info: BuildInfo,
    sessions: Mutex<BTreeMap<String, Arc<OverlayController>>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn MetricStore>, boundaries: Arc<dyn BoundarySource>, info: BuildInfo) -> Self {
        Self {
            fetcher: Arc::new(MetricFetcher::new(
                Arc::clone(&store),
                Arc::new(MetricRowCache::new()),
            )),
            geometry: Arc::new(GeometryCache::new(boundaries)),
            store,
            info,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Builds the state from environment configuration.
    ///
    /// # Errors
    ///
    /// * If `SUPABASE_URL` or `SUPABASE_ANON_KEY` is missing
    pub fn from_env() -> Result<Self, MetricsError> {
        let client = reqwest::Client::new();
        let store = SupabaseRestClient::from_env(client.clone())?;
        let boundaries = HttpBoundarySource::from_env(client);
        Ok(Self::new(
            Arc::new(store),
            Arc::new(boundaries),
            BuildInfo::from_env(),
        ))
    }

    /// The overlay controller for a request.
    ///
    /// Named sessions get a stored controller, created on first use.
    /// Requests without a session get a fresh controller that is never
    /// stored, so anonymous traffic cannot evict named sessions.
    #[must_use]
    pub fn controller_for(&self, session: Option<&str>) -> Arc<OverlayController> {
        match session {
            Some(session) => self.controller(session),
            None => Arc::new(self.new_controller()),
        }
    }

    fn new_controller(&self) -> OverlayController {
        OverlayController::new(Arc::clone(&self.fetcher), Arc::clone(&self.geometry))
    }

    /// The stored overlay controller for `session`, created on first use.
    #[must_use]
    pub fn controller(&self, session: &str) -> Arc<OverlayController> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(controller) = sessions.get(session) {
            return Arc::clone(controller);
        }

        if sessions.len() >= MAX_SESSIONS {
            if let Some((evicted, controller)) = sessions.pop_first() {
                controller.cancel();
                log::debug!("Dropped overlay session {evicted}");
            }
        }
        let controller = Arc::new(self.new_controller());
        sessions.insert(session.to_string(), Arc::clone(&controller));
        controller
    }
}

/// Starts the `RegionIQ` API server.
///
/// Builds the application state from the environment, schedules a
/// background prefetch of every level's boundaries, and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the datastore configuration is
/// missing, or if the HTTP server fails to bind or encounters a runtime
/// error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let state = AppState::from_env().map_err(std::io::Error::other)?;
    log::info!(
        "Serving forecast vintage {} ({}, {})",
        state.info.forecast_vintage,
        state.info.env,
        state.info.git_sha
    );

    let levels = all_levels().iter().map(|def| def.level).collect();
    state.geometry.spawn_prefetch(levels, PREFETCH_DELAY);

    let state = web::Data::new(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let body = ApiError::new("VALIDATION_ERROR", err.to_string());
                InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let body = ApiError::new("VALIDATION_ERROR", err.to_string());
                InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
            }))
            .service(
                web::scope("/api")
                    .route("/health", web::get().to(handlers::health))
                    .route("/version", web::get().to(handlers::version))
                    .route("/schema", web::get().to(handlers::schema))
                    .route("/overlay", web::get().to(handlers::overlay))
                    .route(
                        "/v1/observations/query",
                        web::post().to(handlers::observations_query),
                    ),
            )
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
