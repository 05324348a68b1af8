//! Tests for the CSV and XLSX report downloads.

use axum::http::{header, StatusCode};
use integration_tests::fixtures;
use integration_tests::mocks::MockStore;
use integration_tests::setup::TestContext;
use serde_json::Value;

const CSV_HEADER: &str =
    "date,entity_id,impressions,reach,frequency,clicks,spend,conversions,conversion_value,ctr,cpc,cpm,cpa,roas";

fn context() -> TestContext {
    TestContext::new(MockStore::with_records(fixtures::january_records()))
}

/// Test CSV export content, BOM and headers
#[tokio::test]
async fn test_csv_export() {
    let ctx = context();
    let server = ctx.server();

    let response = server
        .get("/reports/export/csv")
        .add_query_param("start", "2024-01-03")
        .add_query_param("end", "2024-01-03")
        .await;
    response.assert_status_ok();

    let content_type = response.header(header::CONTENT_TYPE);
    assert!(content_type.to_str().unwrap().starts_with("text/csv"));
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert_eq!(
        disposition.to_str().unwrap(),
        "attachment; filename=\"report_20240103_20240103.csv\""
    );

    let bytes = response.as_bytes();
    assert_eq!(&bytes[..3], &[0xEFu8, 0xBB, 0xBF][..]);

    let text = std::str::from_utf8(&bytes[3..]).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            CSV_HEADER,
            "2024-01-03,c1,1000,0,0.00,50,100.00,5,500.00,5.00,2.00,100.00,20.00,5.00",
            "2024-01-03,c2,2000,1600,1.25,40,80.00,2,120.00,2.00,2.00,40.00,40.00,1.50",
        ]
    );
}

/// Test the campaign filter applies to exports
#[tokio::test]
async fn test_csv_export_for_one_campaign() {
    let ctx = context();
    let server = ctx.server();

    let response = server
        .get("/reports/export/csv")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .add_query_param("campaign_id", "c2")
        .await;
    response.assert_status_ok();

    let bytes = response.as_bytes();
    let text = std::str::from_utf8(&bytes[3..]).unwrap();
    let rows: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.split(',').nth(1) == Some("c2")));
    // zero conversions: cpa guarded to zero
    assert!(rows[1].starts_with("2024-01-05,c2,500,0,0.00,10,20.00,0,0.00,2.00,2.00,40.00,0.00,0.00"));
}

/// Test an export with no rows returns 404
#[tokio::test]
async fn test_export_without_data_returns_404() {
    let ctx = context();
    let server = ctx.server();

    for path in ["/reports/export/csv", "/reports/export/xlsx"] {
        let response = server
            .get(path)
            .add_query_param("start", "2023-01-01")
            .add_query_param("end", "2023-01-31")
            .await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND_001");
    }
}

/// Test XLSX export returns a workbook attachment
#[tokio::test]
async fn test_xlsx_export() {
    let ctx = context();
    let server = ctx.server();

    let response = server
        .get("/reports/export/xlsx")
        .add_query_param("start", "2024-01-01")
        .add_query_param("end", "2024-01-07")
        .await;
    response.assert_status_ok();

    let content_type = response.header(header::CONTENT_TYPE);
    assert_eq!(
        content_type.to_str().unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert!(disposition.to_str().unwrap().ends_with(".xlsx\""));

    let bytes = response.as_bytes();
    assert_eq!(&bytes[..2], b"PK");
}

/// Test invalid export windows are rejected
#[tokio::test]
async fn test_export_invalid_window() {
    let ctx = context();
    let server = ctx.server();

    let response = server
        .get("/reports/export/csv")
        .add_query_param("start", "2024-02-01")
        .add_query_param("end", "2024-01-01")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}
