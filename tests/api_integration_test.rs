//! REST API integration tests for SafePlate Risk Ledger.
//!
//! These tests drive the full router in-process with `tower::ServiceExt`.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;

use safeplate_ledger::domain::RequestId;
use safeplate_ledger::server::build_router;

use common::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn create_test_router(ledger: &TestLedger) -> axum::Router<()> {
    build_router(None).with_state(ledger.app_state())
}

/// Send a request to the test router.
async fn send_request(
    app: &axum::Router<()>,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }

    let body = body
        .map(|v| Body::from(serde_json::to_vec(&v).unwrap()))
        .unwrap_or_else(|| Body::from(Vec::new()));

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec();

    let json = if bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes) }))
    };

    (status, json)
}

fn report_body(
    ledger: &TestLedger,
    hygiene: u32,
    food_safety: u32,
    facility: u32,
) -> serde_json::Value {
    json!({
        "restaurant_id": sealed_hex(&ledger.ciphertexts, 4242),
        "hygiene": sealed_hex(&ledger.ciphertexts, hygiene),
        "food_safety": sealed_hex(&ledger.ciphertexts, food_safety),
        "facility": sealed_hex(&ledger.ciphertexts, facility),
        "location_code": TEST_LOCATION,
    })
}

fn request_id_of(body: &serde_json::Value) -> RequestId {
    serde_json::from_value(body["request_id"].clone()).unwrap()
}

/// Post the local oracle's callback for `request_id`
async fn post_callback(
    app: &axum::Router<()>,
    ledger: &TestLedger,
    request_id: &RequestId,
) -> (StatusCode, serde_json::Value) {
    let callback = ledger.callback(request_id);
    send_request(
        app,
        Method::POST,
        "/api/v1/oracle/callback",
        Some(serde_json::to_value(&callback).unwrap()),
    )
    .await
}

// ============================================================================
// Health and metrics
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, body) = send_request(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "safeplate-ledger");
    assert_eq!(body["pending_requests"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint_exports_prometheus_text() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, _) = send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send_request(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body["raw"].as_str().unwrap();
    assert!(text.contains("safeplate_reports_submitted"));
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn test_submit_and_get_report() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["report_id"], 1);
    assert!(body["submitted_at"].is_string());

    let (status, body) = send_request(&app, Method::GET, "/api/v1/reports/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report_id"], 1);
    assert_eq!(body["location_code"], TEST_LOCATION);
    assert_eq!(body["status"]["state"], "created");
    assert!(body["fields"]["hygiene"].as_str().unwrap().starts_with("0x"));
}

#[tokio::test]
async fn test_get_unknown_report_returns_404() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, body) = send_request(&app, Method::GET, "/api/v1/reports/0", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "REPORT_NOT_FOUND");
    assert_eq!(body["error"]["numeric_code"], 2001);
}

#[tokio::test]
async fn test_submit_report_rejects_bad_input() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let mut body = report_body(&ledger, 90, 85, 80);
    body["hygiene"] = json!("0x");
    let (status, response) =
        send_request(&app, Method::POST, "/api/v1/reports", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "INVALID_FIELD_VALUE");
    assert_eq!(response["error"]["details"]["field"], "hygiene");

    let mut body = report_body(&ledger, 90, 85, 80);
    body["facility"] = json!("0x0102");
    let (status, response) =
        send_request(&app, Method::POST, "/api/v1/reports", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "MALFORMED_ENCRYPTED_INPUT");

    let body = report_body(&ledger, 150, 85, 80);
    let (status, response) =
        send_request(&app, Method::POST, "/api/v1/reports", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "MALFORMED_ENCRYPTED_INPUT");

    let (status, response) = send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(json!({ "hygiene": 90 })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(response["error"]["code"], "INVALID_REQUEST_BODY");

    assert_eq!(ledger.service.store().report_count().await, 0);
}

// ============================================================================
// Decrypt requests and callbacks
// ============================================================================

#[tokio::test]
async fn test_full_pipeline_over_http() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 40, 30, 20)),
    )
    .await;

    // Risk calculation
    let (status, body) =
        send_request(&app, Method::POST, "/api/v1/reports/1/risk-requests", None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["purpose"], 1);
    let request_id = request_id_of(&body);

    let (status, pending) = send_request(&app, Method::GET, "/api/v1/oracle/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, body) = post_callback(&app, &ledger, &request_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "risk_calculated");
    assert_eq!(body["analysis_id"], 1);
    assert!(body.get("risk_score").is_none());

    let (_, analysis) = send_request(&app, Method::GET, "/api/v1/analyses/1", None).await;
    assert_eq!(analysis["revealed"], false);
    assert!(analysis.get("risk_score").is_none());

    // Reveal
    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/v1/analyses/1/reveal-requests",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let reveal_id = request_id_of(&body);

    let (status, body) = post_callback(&app, &ledger, &reveal_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "analysis_revealed");
    assert_eq!(body["risk_score"], 210);
    assert_eq!(body["priority_level"], 3);

    let (_, analysis) = send_request(&app, Method::GET, "/api/v1/analyses/1", None).await;
    assert_eq!(analysis["revealed"], true);
    assert_eq!(analysis["risk_score"], 210);

    // Area stats
    let uri = format!("/api/v1/areas/{TEST_LOCATION}/stats-requests");
    let (status, body) = send_request(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let stats_id = request_id_of(&body);

    let (status, body) = post_callback(&app, &ledger, &stats_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "area_stats_revealed");
    assert_eq!(body["hygiene_sum"], 40);
    assert_eq!(body["high_risk_count"], 1);

    let (_, stats) = send_request(&app, Method::GET, "/api/v1/stats", None).await;
    assert_eq!(stats["report_count"], 1);
    assert_eq!(stats["analysis_count"], 1);
    assert_eq!(stats["pending_requests"], 0);

    let (_, notifications) =
        send_request(&app, Method::GET, "/api/v1/notifications", None).await;
    let types: Vec<&str> = notifications
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "ReportSubmitted",
            "AnalysisRequested",
            "RiskIdentified",
            "AnalysisRevealed"
        ]
    );

    let (_, tail) =
        send_request(&app, Method::GET, "/api/v1/notifications?after=3", None).await;
    assert_eq!(tail.as_array().unwrap().len(), 1);
    assert_eq!(tail[0]["sequence"], 4);

    let (_, page) =
        send_request(&app, Method::GET, "/api/v1/notifications?limit=2", None).await;
    assert_eq!(page.as_array().unwrap().len(), 2);
    assert_eq!(page[1]["sequence"], 2);
}

#[tokio::test]
async fn test_replayed_callback_returns_409() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    let (_, body) =
        send_request(&app, Method::POST, "/api/v1/reports/1/risk-requests", None).await;
    let request_id = request_id_of(&body);

    let callback = serde_json::to_value(ledger.callback(&request_id)).unwrap();
    let (status, _) = send_request(
        &app,
        Method::POST,
        "/api/v1/oracle/callback",
        Some(callback.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/v1/oracle/callback",
        Some(callback),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "UNKNOWN_OR_REPLAYED_REQUEST");
    assert_eq!(body["error"]["request_id"], request_id.to_string());
}

#[tokio::test]
async fn test_forged_callback_returns_400() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    let (_, body) =
        send_request(&app, Method::POST, "/api/v1/reports/1/risk-requests", None).await;
    let request_id = request_id_of(&body);

    let forged = foreign_callback(request_id, &[100, 100, 100, TEST_LOCATION]);
    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/v1/oracle/callback",
        Some(serde_json::to_value(&forged).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PROOF");
    assert!(ledger.service.store().is_pending(&request_id).await);
}

#[tokio::test]
async fn test_dispatch_errors_map_to_status_codes() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, body) =
        send_request(&app, Method::POST, "/api/v1/reports/9/risk-requests", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_TARGET");

    let (status, body) = send_request(&app, Method::GET, "/api/v1/areas/5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "AREA_NOT_FOUND");

    send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    let (_, body) =
        send_request(&app, Method::POST, "/api/v1/reports/1/risk-requests", None).await;
    post_callback(&app, &ledger, &request_id_of(&body)).await;
    let (status, body) =
        send_request(&app, Method::POST, "/api/v1/reports/1/risk-requests", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_STATE_TRANSITION");

    ledger.oracle.set_available(false);
    send_request(
        &app,
        Method::POST,
        "/api/v1/reports",
        Some(report_body(&ledger, 90, 85, 80)),
    )
    .await;
    let (status, body) =
        send_request(&app, Method::POST, "/api/v1/reports/2/risk-requests", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "ORACLE_UNAVAILABLE");
}

#[tokio::test]
async fn test_malformed_callback_body_is_rejected() {
    let ledger = TestLedger::new();
    let app = create_test_router(&ledger);

    let (status, body) = send_request(
        &app,
        Method::POST,
        "/api/v1/oracle/callback",
        Some(json!({ "request_id": "not-a-uuid", "cleartexts": "0x", "proof": "0x" })),
    )
    .await;
    assert!(status.is_client_error());
    assert_eq!(body["error"]["code"], "INVALID_REQUEST_BODY");
}
