//! Memoized metric-row fetching for the overlay.
//!
//! Rows are cached by the full [`MetricKey`]; two keys never share an
//! entry. Only successful fetches are memoized. A failed fetch is logged
//! and reported to the caller as an empty row set, so the next change of
//! input retries it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use regioniq_boundary::registry::level_definition;
use regioniq_metrics_models::{MetricKey, MetricRow};
use regioniq_region_models::{
    LevelDefinition, RegionLevel,
    codes::{NI_DATASTORE_CODE, NI_ITL2_CODE},
};

use crate::{
    MetricsError,
    catalogue::{EMP_TOTAL_JOBS, EMP_TOTAL_JOBS_NI},
    store::{MetricStore, RowFilter},
};

/// TTL-less memo of metric rows keyed by [`MetricKey`].
#[derive(Debug, Default)]
pub struct MetricRowCache {
    entries: Mutex<BTreeMap<MetricKey, Arc<Vec<MetricRow>>>>,
}

impl MetricRowCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &MetricKey) -> Option<Arc<Vec<MetricRow>>> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: MetricKey, rows: Arc<Vec<MetricRow>>) {
        self.lock().insert(key, rows);
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<MetricKey, Arc<Vec<MetricRow>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fetches overlay rows through an injected store and cache.
pub struct MetricFetcher<S: ?Sized> {
    store: Arc<S>,
    cache: Arc<MetricRowCache>,
}

impl<S: MetricStore + ?Sized> MetricFetcher<S> {
    #[must_use]
    pub const fn new(store: Arc<S>, cache: Arc<MetricRowCache>) -> Self {
        Self { store, cache }
    }

    /// The cache this fetcher memoizes into.
    #[must_use]
    pub const fn cache(&self) -> &Arc<MetricRowCache> {
        &self.cache
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the rows for `key`, from the cache when present.
    ///
    /// Query failures yield an empty row set that is not cached.
    pub async fn fetch(&self, key: &MetricKey) -> Arc<Vec<MetricRow>> {
        if let Some(rows) = self.cache.get(key) {
            log::debug!("Metric cache hit for {key:?}");
            return rows;
        }

        match self.try_fetch(key).await {
            Ok(rows) => {
                let rows = Arc::new(rows);
                self.cache.insert(key.clone(), Arc::clone(&rows));
                rows
            }
            Err(e) => {
                log::warn!(
                    "Failed to fetch {} {} {} rows: {e}",
                    key.level,
                    key.metric_id,
                    key.year
                );
                Arc::new(Vec::new())
            }
        }
    }

    /// Queries the rows for `key`, bypassing the cache.
    ///
    /// Total employment is stored without Northern Ireland, whose jobs
    /// live under a separate metric id. At ITL1 that series is only
    /// published at ITL2 (`TLN0`), so it is read from the ITL2 table and
    /// re-labelled to the NI country code; at every other level it comes
    /// from the same table unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if any underlying query fails.
    pub async fn try_fetch(&self, key: &MetricKey) -> Result<Vec<MetricRow>, MetricsError> {
        let def = level_definition(key.level);
        let mut rows = self
            .select_with_fallback(def, &RowFilter::metric_period(&key.metric_id, key.year))
            .await?;

        if key.metric_id == EMP_TOTAL_JOBS {
            let ni_filter = RowFilter::metric_period(EMP_TOTAL_JOBS_NI, key.year);
            let ni_rows = if key.level == RegionLevel::Itl1 {
                let itl2 = level_definition(RegionLevel::Itl2);
                self.store
                    .select(&itl2.table, &ni_filter.with_region(NI_ITL2_CODE))
                    .await?
                    .into_iter()
                    .map(|mut row| {
                        row.region_code = NI_DATASTORE_CODE.to_string();
                        row
                    })
                    .collect()
            } else {
                self.select_with_fallback(def, &ni_filter).await?
            };
            rows.extend(ni_rows);
        }

        Ok(rows)
    }

    async fn select_with_fallback(
        &self,
        def: &LevelDefinition,
        filter: &RowFilter,
    ) -> Result<Vec<MetricRow>, MetricsError> {
        let rows = self.store.select(&def.table, filter).await?;
        match &def.fallback_table {
            Some(fallback) if rows.is_empty() => {
                log::debug!("{} returned no rows, querying {fallback}", def.table);
                self.store.select(fallback, filter).await
            }
            _ => Ok(rows),
        }
    }
}
