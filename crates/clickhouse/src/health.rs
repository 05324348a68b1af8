//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use crate::schema::{all_tables, create_database};
use dashboard_core::error::DbErrorCode;
use dashboard_core::{Error, Result};
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Create the database and tables if missing.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let database = &client.config().database;
    client
        .inner()
        .clone()
        .with_database("default")
        .query(&create_database(database))
        .execute()
        .await
        .map_err(|e| Error::database(DbErrorCode::StoreFailed, format!("create database: {}", e)))?;

    for ddl in all_tables() {
        client
            .inner()
            .query(ddl)
            .execute()
            .await
            .map_err(|e| Error::database(DbErrorCode::StoreFailed, format!("DDL failed: {}", e)))?;
    }

    debug!(database = %database, "ClickHouse schema initialized");
    Ok(())
}
