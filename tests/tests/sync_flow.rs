//! Tests for the sync endpoints driving the sync worker end to end.
//!
//! Records are dated relative to today because a full sync covers the
//! last 30 days.

use axum::http::StatusCode;
use dashboard_core::CampaignStatus;
use integration_tests::fixtures::{self, days_ago};
use integration_tests::mocks::{MockInsightsSource, MockStore};
use integration_tests::setup::TestContext;
use rust_decimal_macros::dec;
use serde_json::Value;

fn source_with_campaigns() -> MockInsightsSource {
    let source = MockInsightsSource::new();
    source.add_account(fixtures::account());
    source.add_campaign(
        fixtures::campaign("c1", "Black Friday", CampaignStatus::Active),
        vec![
            fixtures::reference_record("c1", days_ago(1)),
            fixtures::reference_record("c1", days_ago(2)),
        ],
    );
    source.add_campaign(
        fixtures::campaign("c2", "Old Promo", CampaignStatus::Paused),
        vec![fixtures::reference_record("c2", days_ago(1))],
    );
    source
}

/// Test POST /sync without a Meta token returns 503
#[tokio::test]
async fn test_sync_requires_meta_configuration() {
    let ctx = TestContext::new(MockStore::new());
    let server = ctx.server();

    let response = server.post("/sync").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_001");

    let response = server.post("/campaigns/c1/sync").await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

/// Test a full sync stores active campaign insights and entity rows
#[tokio::test]
async fn test_full_sync_stores_records() {
    let ctx = TestContext::with_source(MockStore::new(), source_with_campaigns());
    let server = ctx.server();

    let response = server.post("/sync").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["outcome"], "succeeded");
    assert_eq!(body["run"]["accounts"], 1);
    assert_eq!(body["run"]["campaigns"], 1);
    assert_eq!(body["run"]["records"], 2);
    assert_eq!(body["run"]["failed_campaigns"], 0);

    // paused campaign is listed but its insights are not fetched
    assert_eq!(ctx.store.record_count(), 2);
    assert!(ctx.store.records().iter().all(|r| r.entity_id == "c1"));
    assert_eq!(ctx.store.sync_runs().len(), 1);

    let response = server.get("/campaigns").await;
    let campaigns: Value = response.json();
    assert_eq!(campaigns.as_array().unwrap().len(), 2);

    let response = server.get("/accounts").await;
    let accounts: Value = response.json();
    assert_eq!(accounts.as_array().unwrap().len(), 1);
}

/// Test cached aggregates are refreshed after a sync
#[tokio::test]
async fn test_sync_invalidates_cached_queries() {
    let ctx = TestContext::with_source(MockStore::new(), source_with_campaigns());
    let server = ctx.server();

    let before: Value = server
        .get("/insights/summary")
        .add_query_param("days", "7")
        .await
        .json();
    assert_eq!(before["result"]["totals"]["impressions"], 0);

    server.post("/sync").await.assert_status_ok();

    let after: Value = server
        .get("/insights/summary")
        .add_query_param("days", "7")
        .await
        .json();
    assert_eq!(after["result"]["totals"]["impressions"], 2000);
    assert_eq!(after["entity_count"], 1);
}

/// Test re-syncing a day overwrites it instead of double counting
#[tokio::test]
async fn test_campaign_resync_overwrites_days() {
    let ctx = TestContext::with_source(MockStore::new(), source_with_campaigns());
    let server = ctx.server();
    server.post("/sync").await.assert_status_ok();

    let source = ctx.source.as_ref().unwrap();
    source.set_insights(
        "c1",
        vec![
            fixtures::record("c1", days_ago(1), 1000, 80, dec!(100.00), 5, dec!(500.00)),
            fixtures::reference_record("c1", days_ago(2)),
        ],
    );

    let response = server
        .post("/campaigns/c1/sync")
        .add_query_param("days", "7")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["campaign_id"], "c1");
    assert_eq!(body["records"], 2);

    assert_eq!(ctx.store.record_count(), 2);

    let summary: Value = server
        .get("/insights/summary")
        .add_query_param("days", "7")
        .await
        .json();
    assert_eq!(summary["result"]["totals"]["impressions"], 2000);
    assert_eq!(summary["result"]["totals"]["clicks"], 130);
}

/// Test one failing campaign yields a partial run
#[tokio::test]
async fn test_partial_sync() {
    let source = source_with_campaigns();
    source.add_campaign(
        fixtures::campaign("c3", "Launch", CampaignStatus::Active),
        vec![fixtures::reference_record("c3", days_ago(1))],
    );
    source.fail_campaign("c1");

    let ctx = TestContext::with_source(MockStore::new(), source);
    let server = ctx.server();

    let response = server.post("/sync").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["outcome"], "partial");
    assert_eq!(body["run"]["campaigns"], 2);
    assert_eq!(body["run"]["failed_campaigns"], 1);
    assert_eq!(body["run"]["records"], 1);
    assert!(ctx.store.records().iter().all(|r| r.entity_id == "c3"));
}

/// Test an expired token fails the run but stored data stays queryable
#[tokio::test]
async fn test_expired_token_keeps_stale_data() {
    let store = MockStore::with_records(vec![fixtures::reference_record("c1", days_ago(3))]);
    let source = source_with_campaigns();
    source.expire_token();

    let ctx = TestContext::with_source(store, source);
    let server = ctx.server();

    let response = server.post("/sync").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["outcome"], "failed");
    assert!(body["run"]["error"]
        .as_str()
        .unwrap()
        .contains("UPSTREAM_002"));

    let response = server.post("/campaigns/c1/sync").await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["code"], "UPSTREAM_002");

    let summary: Value = server
        .get("/insights/summary")
        .add_query_param("days", "7")
        .await
        .json();
    assert_eq!(summary["result"]["totals"]["impressions"], 1000);

    assert_eq!(ctx.store.sync_runs().len(), 1);
    assert_eq!(ctx.sync.as_ref().unwrap().generation(), 0);
}

/// Test campaign sync validates its window
#[tokio::test]
async fn test_campaign_sync_rejects_bad_window() {
    let ctx = TestContext::with_source(MockStore::new(), source_with_campaigns());
    let server = ctx.server();

    let response = server
        .post("/campaigns/c1/sync")
        .add_query_param("days", "0")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.source.as_ref().unwrap().insight_calls(), 0);
}
