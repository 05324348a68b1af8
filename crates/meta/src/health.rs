//! Meta API health checks.

use crate::client::MetaAdsClient;
use telemetry::health;
use tracing::{debug, error};

/// Checks the access token and updates the `meta_api` health component.
pub async fn check_connection(client: &MetaAdsClient) -> bool {
    if !client.config().is_configured() {
        health().meta_api.set_unhealthy("no access token configured");
        return false;
    }

    match client.check_token().await {
        Ok(()) => {
            debug!("Meta API token valid");
            health().meta_api.set_healthy();
            true
        }
        Err(e) => {
            error!("Meta API check failed: {}", e);
            health().meta_api.set_unhealthy(e.to_string());
            false
        }
    }
}
