//! ClickHouse client wrapper.

use crate::config::ClickHouseConfig;
use clickhouse::Client;
use dashboard_core::error::DbErrorCode;
use dashboard_core::{Error, Result};
use telemetry::metrics;
use tracing::info;

/// ClickHouse client wrapper.
#[derive(Clone)]
pub struct ClickHouseClient {
    inner: Client,
    config: ClickHouseConfig,
}

impl ClickHouseClient {
    /// Creates a new ClickHouse client.
    pub fn new(config: ClickHouseConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::validation("clickhouse url must not be empty"));
        }

        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);

        if let Some(ref user) = config.username {
            client = client.with_user(user);
        }

        if let Some(ref pass) = config.password {
            client = client.with_password(pass);
        }

        info!(
            url = %config.url,
            database = %config.database,
            "Created ClickHouse client"
        );

        Ok(Self {
            inner: client,
            config,
        })
    }

    /// Returns the inner clickhouse client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

/// Wraps a ClickHouse driver error as a coded storage error.
pub(crate) fn store_error(context: &str, err: clickhouse::error::Error) -> Error {
    metrics().store_errors.inc();
    Error::database(DbErrorCode::StoreFailed, format!("{}: {}", context, err))
}
