#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overlay orchestration.
//!
//! [`OverlayController`] turns an [`OverlayRequest`] into a rendered
//! [`OverlayFrame`]: it loads boundary geometry and metric rows
//! concurrently, runs the choropleth pipeline, and advances the camera.
//! Inputs may change faster than responses arrive, so every request takes
//! a [`guard::RequestTicket`] and a response whose ticket is no longer
//! current is dropped. The last frame that did render stays available
//! through [`OverlayController::current_frame`] while newer requests are
//! in flight.

pub mod guard;

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use regioniq_boundary::{cache::GeometryCache, fetch::BoundarySource, registry::level_definition};
use regioniq_choropleth::{
    OverlayParams, build_overlay,
    camera::{CameraController, CameraInput, RegionRef},
};
use regioniq_choropleth_models::{CameraCommand, Overlay, OverlayMode};
use regioniq_metrics::{catalogue::growth_always_positive, fetcher::MetricFetcher, store::MetricStore};
use regioniq_metrics_models::{MetricKey, MetricRow, Scenario};
use regioniq_region_models::{RegionLevel, codes::to_boundary_code};
use serde::{Deserialize, Serialize};

use crate::guard::RequestGuard;

/// Everything the user can change about the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayRequest {
    pub level: RegionLevel,
    pub metric_id: String,
    pub year: i32,
    #[serde(default)]
    pub scenario: Scenario,
    pub mode: OverlayMode,
    /// Selected region, datastore or boundary code.
    pub selected: Option<String>,
    /// Region to fit the camera to once.
    pub focus: Option<String>,
    /// Regions inside the active parent; others are faded.
    pub mask: Option<BTreeSet<String>>,
}

impl OverlayRequest {
    /// Absolute-value baseline request with no selection.
    #[must_use]
    pub fn new(level: RegionLevel, metric_id: impl Into<String>, year: i32) -> Self {
        Self {
            level,
            metric_id: metric_id.into(),
            year,
            scenario: Scenario::Baseline,
            mode: OverlayMode::Absolute,
            selected: None,
            focus: None,
            mask: None,
        }
    }

    /// Cache key of the current-period rows.
    #[must_use]
    pub fn metric_key(&self) -> MetricKey {
        MetricKey::new(self.level, self.metric_id.clone(), self.year, self.scenario)
    }

    /// Cache key of the past-period rows, in growth mode only.
    #[must_use]
    pub fn past_metric_key(&self) -> Option<MetricKey> {
        match self.mode {
            OverlayMode::Growth { years } => Some(self.metric_key().years_back(years)),
            OverlayMode::Absolute => None,
        }
    }
}

/// A rendered overlay and the camera move that goes with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayFrame {
    pub request: OverlayRequest,
    pub overlay: Overlay,
    pub camera: Option<CameraCommand>,
}

/// Result of [`OverlayController::apply`].
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// The request rendered and is now the current frame.
    Ready(Arc<OverlayFrame>),
    /// A newer request started before this one finished.
    Superseded,
    /// Boundary geometry for the level could not be loaded.
    NoGeometry,
}

#[derive(Default)]
struct ViewState {
    camera: CameraController,
    last_good: Option<Arc<OverlayFrame>>,
}

/// Drives one view of the overlay.
///
/// The metric fetcher and geometry cache are shared; the request guard,
/// camera and last-known-good frame belong to this controller.
pub struct OverlayController {
    fetcher: Arc<MetricFetcher<dyn MetricStore>>,
    geometry: Arc<GeometryCache<dyn BoundarySource>>,
    guard: RequestGuard,
    state: Mutex<ViewState>,
}

impl OverlayController {
    #[must_use]
    pub fn new(
        fetcher: Arc<MetricFetcher<dyn MetricStore>>,
        geometry: Arc<GeometryCache<dyn BoundarySource>>,
    ) -> Self {
        Self {
            fetcher,
            geometry,
            guard: RequestGuard::new(),
            state: Mutex::new(ViewState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The last frame that rendered, if any.
    #[must_use]
    pub fn current_frame(&self) -> Option<Arc<OverlayFrame>> {
        self.state().last_good.clone()
    }

    /// Drops any in-flight request, e.g. when the view goes away.
    pub fn cancel(&self) {
        self.guard.cancel();
    }

    /// Forgets the camera history and the last frame.
    pub fn reset(&self) {
        self.guard.cancel();
        *self.state() = ViewState::default();
    }

    /// Loads the boundaries of `levels` in the background after `delay`.
    pub fn prefetch(&self, levels: Vec<RegionLevel>, delay: Duration) -> tokio::task::JoinHandle<()> {
        self.geometry.spawn_prefetch(levels, delay)
    }

    /// Renders `request`.
    ///
    /// Geometry and rows load concurrently. If another request started in
    /// the meantime the result is discarded and the previous frame stays
    /// current.
    pub async fn apply(&self, request: OverlayRequest) -> ApplyOutcome {
        let ticket = self.guard.begin();
        let key = request.metric_key();
        let past_key = request.past_metric_key();

        let (geometry, current, past) = futures::join!(
            self.geometry.get(request.level),
            self.fetcher.fetch(&key),
            self.fetch_past(past_key.as_ref()),
        );

        if !self.guard.is_current(ticket) {
            log::debug!(
                "Discarding superseded {} {} overlay (generation {})",
                request.level,
                request.metric_id,
                ticket.generation()
            );
            return ApplyOutcome::Superseded;
        }

        let Some(geometry) = geometry else {
            return ApplyOutcome::NoGeometry;
        };

        let def = level_definition(request.level);
        let params = OverlayParams {
            level: request.level,
            scenario: request.scenario,
            mode: request.mode,
            always_positive: growth_always_positive(&request.metric_id),
            selected: request.selected.as_deref(),
            mask: request.mask.as_ref(),
        };
        let Some(overlay) = build_overlay(&geometry, def, &params, &current, &past) else {
            log::warn!(
                "Loaded {} geometry does not match requested level {}",
                geometry.level,
                request.level
            );
            return ApplyOutcome::NoGeometry;
        };

        let selected = overlay
            .features
            .iter()
            .find(|f| f.selected)
            .map(|f| RegionRef::new(request.level, f.code.clone()));
        let focus = request.focus.as_deref().map(|code| {
            RegionRef::new(
                request.level,
                def.resolve_code(&to_boundary_code(request.level, code)),
            )
        });

        let mut state = self.state();
        if !self.guard.is_current(ticket) {
            log::debug!("Discarding superseded frame {}", ticket.generation());
            return ApplyOutcome::Superseded;
        }
        let camera = state.camera.update(&CameraInput {
            level: request.level,
            selected: selected.as_ref(),
            focus: focus.as_ref(),
            features: &overlay.features,
        });
        let frame = Arc::new(OverlayFrame {
            request,
            overlay,
            camera,
        });
        state.last_good = Some(Arc::clone(&frame));
        drop(state);

        ApplyOutcome::Ready(frame)
    }

    async fn fetch_past(&self, key: Option<&MetricKey>) -> Arc<Vec<MetricRow>> {
        match key {
            Some(key) => self.fetcher.fetch(key).await,
            None => Arc::new(Vec::new()),
        }
    }
}
