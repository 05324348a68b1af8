//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clickhouse_client::MetricStore;
use dashboard_core::{DailyMetricRecord, DateWindow, Result};
use moka::future::Cache;
use telemetry::metrics;
use tracing::debug;
use worker::SyncWorker;

/// Cache TTL for fetched record sets (60 seconds).
const RECORD_CACHE_TTL: Duration = Duration::from_secs(60);

/// Maximum cached record sets.
const RECORD_CACHE_MAX_CAPACITY: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordQuery {
    generation: u64,
    start: NaiveDate,
    end: NaiveDate,
    entity_ids: Option<Vec<String>>,
}

/// Store reads cached per query.
///
/// Keys carry the sync generation, so entries fetched before a sync are
/// never served after it.
#[derive(Clone)]
pub struct RecordCache {
    cache: Cache<RecordQuery, Arc<Vec<DailyMetricRecord>>>,
}

impl RecordCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(RECORD_CACHE_MAX_CAPACITY)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(RECORD_CACHE_TTL)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Metric store (ClickHouse in production, in-memory in tests)
    pub store: Arc<dyn MetricStore>,
    /// Sync worker, absent when the Meta API is not configured
    pub sync: Option<Arc<SyncWorker>>,
    pub records: RecordCache,
}

impl AppState {
    pub fn new(store: Arc<dyn MetricStore>) -> Self {
        Self {
            store,
            sync: None,
            records: RecordCache::default(),
        }
    }

    pub fn with_sync(mut self, sync: Arc<SyncWorker>) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Current date in UTC, the reference for presets and relative windows.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn generation(&self) -> u64 {
        self.sync.as_ref().map(|s| s.generation()).unwrap_or(0)
    }

    /// Records in `window` for `entity_ids`, served from cache when fresh.
    pub async fn fetch_records(
        &self,
        window: &DateWindow,
        entity_ids: Option<&[String]>,
    ) -> Result<Arc<Vec<DailyMetricRecord>>> {
        let key = RecordQuery {
            generation: self.generation(),
            start: window.start(),
            end: window.end(),
            entity_ids: entity_ids.map(<[String]>::to_vec),
        };

        if let Some(cached) = self.records.cache.get(&key).await {
            metrics().cache_hits.inc();
            debug!(window = %window, "Record cache hit");
            return Ok(cached);
        }
        metrics().cache_misses.inc();

        let records = Arc::new(self.store.fetch_records(window, entity_ids).await?);
        self.records.cache.insert(key, records.clone()).await;
        Ok(records)
    }
}
