//! Health check aggregation.
//!
//! ClickHouse being down makes the service unhealthy. A failing Meta API
//! only degrades it: the dashboard keeps serving the data already stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Health status for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

/// Component health state.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    healthy: AtomicBool,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            healthy: AtomicBool::new(false),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn report(&self) -> ComponentHealthReport {
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: self.message(),
        }
    }
}

/// Aggregated health status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
    /// When the last sync cycle finished without a fatal error
    pub last_successful_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Global health registry.
pub struct HealthRegistry {
    pub clickhouse: ComponentHealth,
    pub meta_api: ComponentHealth,
    /// Epoch millis of the last successful sync, 0 when none yet
    last_sync_ms: AtomicI64,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            clickhouse: ComponentHealth::new("clickhouse"),
            meta_api: ComponentHealth::new("meta_api"),
            last_sync_ms: AtomicI64::new(0),
        }
    }

    pub fn record_successful_sync(&self, at: DateTime<Utc>) {
        self.last_sync_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_successful_sync(&self) -> Option<DateTime<Utc>> {
        match self.last_sync_ms.load(Ordering::Relaxed) {
            0 => None,
            ms => DateTime::from_timestamp_millis(ms),
        }
    }

    /// Generate a health report.
    pub fn report(&self) -> HealthReport {
        let status = if !self.clickhouse.is_healthy() {
            HealthStatus::Unhealthy
        } else if !self.meta_api.is_healthy() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            components: vec![self.clickhouse.report(), self.meta_api.report()],
            last_successful_sync: self.last_successful_sync(),
        }
    }

    /// Check if the service can answer dashboard queries.
    pub fn is_ready(&self) -> bool {
        self.clickhouse.is_healthy()
    }

    /// Check if the service is alive.
    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global health registry.
pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

/// Get the global health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
