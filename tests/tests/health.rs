//! Tests for health check endpoints.
//!
//! The health registry is process-global, so tests that flip component
//! state live in a single test function.

use axum::http::StatusCode;
use integration_tests::mocks::MockStore;
use integration_tests::setup::TestContext;
use telemetry::health;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new(MockStore::new());
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );

    let components = body["components"].as_array().expect("components array");
    let names: Vec<&str> = components
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["clickhouse", "meta_api"]);

    assert!(body.get("last_successful_sync").is_some());
    assert!(body["last_sync_run"].is_null());
}

/// Test /health/live always answers
#[tokio::test]
async fn test_liveness_probe() {
    let ctx = TestContext::new(MockStore::new());
    let server = ctx.server();

    server.get("/health/live").await.assert_status_ok();
}

/// Test readiness follows ClickHouse and a Meta outage only degrades
#[tokio::test]
async fn test_readiness_and_degraded_status() {
    let ctx = TestContext::new(MockStore::new());
    let server = ctx.server();

    health().clickhouse.set_healthy();
    health().meta_api.set_unhealthy("Error validating access token");

    server.get("/health/ready").await.assert_status_ok();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "degraded");
    assert_eq!(
        body["components"][1]["message"],
        "Error validating access token"
    );

    health().meta_api.set_healthy();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");

    health().clickhouse.set_unhealthy("Connection failed");
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "unhealthy");
}
