//! Tests for the KPI endpoints: summary, timeseries and compare.

use axum::http::StatusCode;
use axum_test::TestServer;
use dashboard_core::CampaignStatus;
use integration_tests::fixtures::{self, jan};
use integration_tests::mocks::MockStore;
use integration_tests::setup::TestContext;
use serde_json::Value;

fn num(value: &Value) -> f64 {
    value
        .as_f64()
        .unwrap_or_else(|| panic!("expected a number, got {}", value))
}

async fn summary(server: &TestServer, start: &str, end: &str) -> Value {
    let response = server
        .get("/insights/summary")
        .add_query_param("start", start)
        .add_query_param("end", end)
        .await;
    response.assert_status_ok();
    response.json()
}

fn january_context() -> TestContext {
    let store = MockStore::with_records(fixtures::january_records());
    store.seed_campaigns(vec![
        fixtures::campaign("c1", "Black Friday", CampaignStatus::Active),
        {
            let mut other = fixtures::campaign("c2", "Remarketing", CampaignStatus::Paused);
            other.account_id = "999".to_string();
            other
        },
    ]);
    store.seed_accounts(vec![fixtures::account()]);
    TestContext::new(store)
}

/// Test the reference day yields the documented ratios
#[tokio::test]
async fn test_summary_reference_scenario() {
    let ctx = TestContext::new(MockStore::with_records(vec![fixtures::reference_record(
        "c1",
        jan(1),
    )]));
    let server = ctx.server();

    let body = summary(&server, "2024-01-01", "2024-01-01").await;

    let totals = &body["result"]["totals"];
    assert_eq!(totals["impressions"], 1000);
    assert_eq!(totals["clicks"], 50);
    assert_eq!(num(&totals["spend"]), 100.0);
    assert_eq!(totals["conversions"], 5);
    assert_eq!(num(&totals["conversion_value"]), 500.0);

    let metrics = &body["result"]["metrics"];
    assert_eq!(num(&metrics["ctr"]), 5.0);
    assert_eq!(num(&metrics["cpc"]), 2.0);
    assert_eq!(num(&metrics["cpm"]), 100.0);
    assert_eq!(num(&metrics["cpa"]), 20.0);
    assert_eq!(num(&metrics["roas"]), 5.0);

    assert_eq!(body["entity_count"], 1);
    assert_eq!(body["record_count"], 1);
    assert_eq!(body["result"]["group"]["kind"], "all");
    assert_eq!(body["result"]["window"]["start"], "2024-01-01");
}

/// Test days without delivery produce an all-zero result, not an error
#[tokio::test]
async fn test_summary_zero_activity() {
    let ctx = TestContext::new(MockStore::with_records(vec![
        fixtures::zero_record("c1", jan(1)),
        fixtures::zero_record("c1", jan(2)),
    ]));
    let server = ctx.server();

    let body = summary(&server, "2024-01-01", "2024-01-02").await;

    for field in ["impressions", "clicks", "spend", "conversions", "conversion_value"] {
        assert_eq!(num(&body["result"]["totals"][field]), 0.0, "{}", field);
    }
    for field in ["ctr", "cpc", "cpm", "cpa", "roas"] {
        assert_eq!(num(&body["result"]["metrics"][field]), 0.0, "{}", field);
    }
    assert_eq!(body["record_count"], 2);
}

/// Test an empty window returns zeros
#[tokio::test]
async fn test_summary_empty_window() {
    let ctx = january_context();
    let server = ctx.server();

    let body = summary(&server, "2023-06-01", "2023-06-30").await;
    assert_eq!(body["result"]["totals"]["impressions"], 0);
    assert_eq!(body["entity_count"], 0);
}

/// Test raw counters add up over disjoint windows
#[tokio::test]
async fn test_summary_is_additive() {
    let ctx = january_context();
    let server = ctx.server();

    let first = summary(&server, "2024-01-01", "2024-01-03").await;
    let second = summary(&server, "2024-01-04", "2024-01-07").await;
    let whole = summary(&server, "2024-01-01", "2024-01-07").await;

    for field in ["impressions", "clicks", "conversions"] {
        let parts = first["result"]["totals"][field].as_u64().unwrap()
            + second["result"]["totals"][field].as_u64().unwrap();
        assert_eq!(parts, whole["result"]["totals"][field].as_u64().unwrap(), "{}", field);
    }
    let spend = num(&first["result"]["totals"]["spend"]) + num(&second["result"]["totals"]["spend"]);
    assert!((spend - num(&whole["result"]["totals"]["spend"])).abs() < 1e-9);

    assert_eq!(whole["result"]["totals"]["impressions"], 9500);
    assert_eq!(whole["entity_count"], 2);
}

/// Test campaign and account filters
#[tokio::test]
async fn test_summary_scoped_by_campaign_and_account() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/summary")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("campaign_id", "c2")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["totals"]["impressions"], 2500);
    assert_eq!(body["result"]["group"]["kind"], "entity");
    assert_eq!(body["result"]["group"]["entity_id"], "c2");

    let response = server
        .get("/insights/summary")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("account_id", fixtures::ACCOUNT_ID)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["totals"]["impressions"], 7000);
    assert_eq!(body["entity_count"], 1);

    let response = server
        .get("/insights/summary")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("account_id", "555")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["totals"]["impressions"], 0);
}

/// Test a 3-day series with data on day 2 only
#[tokio::test]
async fn test_timeseries_zero_fills_days() {
    let ctx = TestContext::new(MockStore::with_records(vec![fixtures::reference_record(
        "c1",
        jan(2),
    )]));
    let server = ctx.server();

    let response = server
        .get("/insights/timeseries")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-03")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    let days: Vec<&str> = points
        .iter()
        .map(|p| p["window"]["start"].as_str().unwrap())
        .collect();
    assert_eq!(days, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);

    assert_eq!(points[0]["totals"]["impressions"], 0);
    assert_eq!(points[1]["totals"]["impressions"], 1000);
    assert_eq!(num(&points[1]["metrics"]["ctr"]), 5.0);
    assert_eq!(points[2]["totals"]["impressions"], 0);
    assert_eq!(body["window"]["end"], "2024-01-03");
}

/// Test compare against the preceding period
#[tokio::test]
async fn test_compare_with_preceding_window() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/compare")
        .add_query_param("start", "2024-01-05")
        .add_query_param("end", "2024-01-07")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["previous"]["window"]["start"], "2024-01-02");
    assert_eq!(body["previous"]["window"]["end"], "2024-01-04");
    assert_eq!(body["current"]["totals"]["impressions"], 3500);
    assert_eq!(body["previous"]["totals"]["impressions"], 5000);
    assert_eq!(num(&body["deltas"]["impressions"]), -30.0);
}

/// Test a previous value of zero gives a zero delta
#[tokio::test]
async fn test_compare_zero_baseline() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/compare")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("prev_start", "2023-12-01")
        .add_query_param("prev_end", "2023-12-07")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["previous"]["totals"]["impressions"], 0);
    for field in ["impressions", "clicks", "spend", "ctr", "roas"] {
        assert_eq!(num(&body["deltas"][field]), 0.0, "{}", field);
    }
}

/// Test a distant previous window is fetched on its own
#[tokio::test]
async fn test_compare_fetches_each_window_separately() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/compare")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("prev_start", "2020-01-01")
        .add_query_param("prev_end", "2020-01-07")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["current"]["totals"]["impressions"], 9500);

    let windows = ctx.store.fetched_windows();
    assert_eq!(windows.len(), 2);
    assert!(windows.iter().all(|w| w.days() == 7), "{:?}", windows);
}

/// Test overlapping comparison windows are rejected
#[tokio::test]
async fn test_compare_overlapping_windows_rejected() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/compare")
        .add_query_param("start", "2024-01-03")
        .add_query_param("end", "2024-01-07")
        .add_query_param("prev_start", "2024-01-01")
        .add_query_param("prev_end", "2024-01-03")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Test malformed windows return coded validation errors
#[tokio::test]
async fn test_invalid_windows_rejected() {
    let ctx = january_context();
    let server = ctx.server();

    let cases: [(&[(&str, &str)], &str); 4] = [
        (&[("start", "2024-01-07"), ("end", "2024-01-01")], "VALID_001"),
        (&[("start", "07/01/2024"), ("end", "2024-01-08")], "VALID_001"),
        (&[("start", "2024-01-01")], "VALID_001"),
        (&[("days", "1000")], "VALID_002"),
    ];

    for (params, code) in cases {
        let mut request = server.get("/insights/summary");
        for (key, value) in params {
            request = request.add_query_param(key, value);
        }
        let response = request.await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["code"], code, "params {:?}", params);
    }
}

/// Test unknown preset values are rejected at the query layer
#[tokio::test]
async fn test_unknown_preset_rejected() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server
        .get("/insights/summary")
        .add_query_param("preset", "last_fortnight")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Test presets resolve relative to today
#[tokio::test]
async fn test_preset_window() {
    let ctx = TestContext::new(MockStore::with_records(vec![fixtures::reference_record(
        "c1",
        fixtures::days_ago(0),
    )]));
    let server = ctx.server();

    let response = server
        .get("/insights/summary")
        .add_query_param("preset", "last_7_days")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["result"]["totals"]["impressions"], 1000);
    assert_eq!(
        body["result"]["window"]["start"],
        fixtures::days_ago(6).format("%Y-%m-%d").to_string()
    );
}

/// Test store failures surface as DB_001
#[tokio::test]
async fn test_store_failure_returns_500() {
    let store = MockStore::new();
    store.set_should_fail(true);
    let ctx = TestContext::new(store);
    let server = ctx.server();

    let response = server
        .get("/insights/summary")
        .add_query_param("days", "7")
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001");
}

/// Test repeated queries are served from the record cache
#[tokio::test]
async fn test_repeated_query_hits_cache() {
    let ctx = january_context();
    let server = ctx.server();

    let first = summary(&server, "2024-01-01", "2024-01-07").await;
    let second = summary(&server, "2024-01-01", "2024-01-07").await;

    assert_eq!(first, second);
    assert_eq!(ctx.store.fetch_count(), 1);
}

/// Test campaign listing, detail and accounts
#[tokio::test]
async fn test_campaign_endpoints() {
    let ctx = january_context();
    let server = ctx.server();

    let response = server.get("/campaigns").await;
    response.assert_status_ok();
    let campaigns: Value = response.json();
    assert_eq!(campaigns.as_array().unwrap().len(), 2);

    let response = server
        .get("/campaigns")
        .add_query_param("status", "active")
        .await;
    response.assert_status_ok();
    let campaigns: Value = response.json();
    assert_eq!(campaigns.as_array().unwrap().len(), 1);
    assert_eq!(campaigns[0]["campaign_id"], "c1");
    assert_eq!(campaigns[0]["status"], "ACTIVE");

    let response = server
        .get("/campaigns")
        .add_query_param("status", "sleeping")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/campaigns/c1").await;
    response.assert_status_ok();
    let detail: Value = response.json();
    assert_eq!(detail["name"], "Black Friday");
    assert_eq!(detail["lifetime"]["totals"]["impressions"], 7000);
    assert_eq!(num(&detail["lifetime"]["metrics"]["roas"]), 5.0);

    let response = server.get("/campaigns/unknown").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_001");

    let response = server.get("/accounts").await;
    response.assert_status_ok();
    let accounts: Value = response.json();
    assert_eq!(accounts[0]["account_id"], fixtures::ACCOUNT_ID);
    assert_eq!(accounts[0]["currency"], "BRL");
}
