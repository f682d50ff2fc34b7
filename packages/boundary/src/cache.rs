//! Session-wide boundary geometry cache.
//!
//! Levels are few and boundary files are large and static, so geometry is
//! kept for the lifetime of the cache once loaded. Each level has its own
//! [`OnceCell`]: callers asking for a level that is already loading wait
//! on the same download instead of issuing another one. Failed loads are
//! not cached, so the next request retries.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use regioniq_region_models::{RegionLevel, geometry::LevelGeometry};
use tokio::sync::OnceCell;

use crate::{fetch::BoundarySource, registry::level_definition};

type GeometryCell = Arc<OnceCell<Arc<LevelGeometry>>>;

/// Per-level boundary geometry cache.
pub struct GeometryCache<B: ?Sized> {
    source: Arc<B>,
    cells: Mutex<BTreeMap<RegionLevel, GeometryCell>>,
}

impl<B: BoundarySource + ?Sized + 'static> GeometryCache<B> {
    #[must_use]
    pub fn new(source: Arc<B>) -> Self {
        Self {
            source,
            cells: Mutex::new(BTreeMap::new()),
        }
    }

    fn cell(&self, level: RegionLevel) -> GeometryCell {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(level).or_default())
    }

    /// Returns the geometry for `level`, loading it on first use.
    ///
    /// Returns `None` if both boundary locations fail; the failure is
    /// logged and the next call tries again.
    pub async fn get(&self, level: RegionLevel) -> Option<Arc<LevelGeometry>> {
        let cell = self.cell(level);
        let result = cell
            .get_or_try_init(|| async {
                log::debug!("Loading {level} boundaries");
                self.source
                    .fetch(level_definition(level))
                    .await
                    .map(Arc::new)
            })
            .await;

        match result {
            Ok(geometry) => Some(Arc::clone(geometry)),
            Err(e) => {
                log::error!("Failed to load {level} boundaries: {e}");
                None
            }
        }
    }

    /// Returns the geometry for `level` only if it is already loaded.
    #[must_use]
    pub fn cached(&self, level: RegionLevel) -> Option<Arc<LevelGeometry>> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(&level).and_then(|cell| cell.get().cloned())
    }

    /// Drops every cached level.
    pub fn clear(&self) {
        self.cells
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<B: BoundarySource + ?Sized + 'static> GeometryCache<B> {
    /// Loads `levels` in the background after `delay`.
    ///
    /// Levels are fetched one at a time and skipped if already cached, so
    /// the prefetch never issues more than one download at once alongside
    /// user-triggered loads.
    pub fn spawn_prefetch(
        self: &Arc<Self>,
        levels: Vec<RegionLevel>,
        delay: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            for level in levels {
                if cache.cached(level).is_some() {
                    continue;
                }
                if cache.get(level).await.is_some() {
                    log::debug!("Prefetched {level} boundaries");
                }
            }
        })
    }
}
