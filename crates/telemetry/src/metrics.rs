//! Internal metrics collection.
//!
//! Collects metrics in-memory and periodically flushes to ClickHouse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that is overwritten on each update.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 5ms, 25ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s, +inf
    buckets: [AtomicU64; 12],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [5, 25, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Records the time elapsed since `start`.
    pub fn observe_since(&self, start: Instant) {
        self.observe(start.elapsed().as_millis() as u64);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns `(upper bound, count)` pairs; the overflow bucket has bound `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the dashboard.
#[derive(Debug, Default)]
pub struct Metrics {
    // Sync
    pub sync_runs: Counter,
    pub sync_failures: Counter,
    pub campaigns_synced: Counter,
    pub campaign_sync_errors: Counter,
    pub records_synced: Counter,
    pub records_rejected: Counter,

    // Meta Marketing API
    pub meta_requests: Counter,
    pub meta_request_errors: Counter,

    // Storage
    pub store_reads: Counter,
    pub store_writes: Counter,
    pub store_errors: Counter,

    // HTTP API
    pub aggregate_requests: Counter,
    pub exports_generated: Counter,
    pub cache_hits: Counter,
    pub cache_misses: Counter,

    // Latency histograms
    pub meta_latency_ms: Histogram,
    pub store_latency_ms: Histogram,
    pub sync_duration_ms: Histogram,

    // Gauges
    pub campaigns_tracked: Gauge,
    pub last_sync_records: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sync_runs: u64,
    pub sync_failures: u64,
    pub campaigns_synced: u64,
    pub campaign_sync_errors: u64,
    pub records_synced: u64,
    pub records_rejected: u64,
    pub meta_requests: u64,
    pub meta_request_errors: u64,
    pub store_reads: u64,
    pub store_writes: u64,
    pub store_errors: u64,
    pub aggregate_requests: u64,
    pub exports_generated: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub meta_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub sync_duration_mean_ms: f64,
    pub campaigns_tracked: u64,
    pub last_sync_records: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sync_runs: self.sync_runs.get(),
            sync_failures: self.sync_failures.get(),
            campaigns_synced: self.campaigns_synced.get(),
            campaign_sync_errors: self.campaign_sync_errors.get(),
            records_synced: self.records_synced.get(),
            records_rejected: self.records_rejected.get(),
            meta_requests: self.meta_requests.get(),
            meta_request_errors: self.meta_request_errors.get(),
            store_reads: self.store_reads.get(),
            store_writes: self.store_writes.get(),
            store_errors: self.store_errors.get(),
            aggregate_requests: self.aggregate_requests.get(),
            exports_generated: self.exports_generated.get(),
            cache_hits: self.cache_hits.get(),
            cache_misses: self.cache_misses.get(),
            meta_latency_mean_ms: self.meta_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            sync_duration_mean_ms: self.sync_duration_ms.mean(),
            campaigns_tracked: self.campaigns_tracked.get(),
            last_sync_records: self.last_sync_records.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
