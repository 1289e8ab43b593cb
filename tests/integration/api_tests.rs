//! API integration tests
//!
//! In-process tests drive the router directly against the in-memory store.
//! Tests marked `#[ignore]` need a running server:
//! `cargo test -- --ignored`

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use reqwest::Client;
use serde_json::{json, Value};
use tower::ServiceExt;

use custodian_server::{
    api,
    config::AppConfig,
    lifecycle::ReferenceCalendar,
    models::{AccessTier, UserClaims},
    repository::MemoryStore,
    services::{notifications::Notifier, Services},
    AppState,
};

const BASE_URL: &str = "http://localhost:8080/api/v1";

const CUSTODIAN_ID: i32 = 1;
const ALICE_ID: i32 = 10;
const BOB_ID: i32 = 11;

fn test_app() -> (Router, AppConfig) {
    let config = AppConfig::default();
    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(Services::new(
            Arc::new(MemoryStore::new()),
            ReferenceCalendar::utc(),
            Notifier::new(),
        )),
    };
    (api::create_router(state), config)
}

fn token(config: &AppConfig, user_id: i32, tier: AccessTier) -> String {
    let now = chrono::Utc::now().timestamp();
    UserClaims {
        sub: format!("user-{}", user_id),
        user_id,
        tier,
        exp: now + 3600,
        iat: now,
    }
    .create_token(&config.auth.jwt_secret)
    .expect("Failed to sign token")
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(format!("/api/v1{}", uri));
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("Failed to send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Failed to parse response")
    };
    (status, body)
}

async fn register_camera(app: &Router, custodian: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/assets",
        Some(custodian),
        Some(json!({ "name": "Camera X", "category": "cameras", "location": "Lab A" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "available");
    body["id"].as_i64().expect("No asset ID")
}

async fn request_window(app: &Router, requester: &str, item_id: i64, start: &str, end: &str) -> i64 {
    let (status, body) = send(
        app,
        "POST",
        "/reservations",
        Some(requester),
        Some(json!({ "item_id": item_id, "start_date": start, "end_date": end })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    body["id"].as_i64().expect("No reservation ID")
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_rejected() {
    let (app, _) = test_app();
    let (status, _) = send(&app, "GET", "/assets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/assets", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_requester_cannot_manage_assets_or_approve() {
    let (app, config) = test_app();
    let custodian = token(&config, CUSTODIAN_ID, AccessTier::Custodian);
    let alice = token(&config, ALICE_ID, AccessTier::Requester);

    let (status, _) = send(
        &app,
        "POST",
        "/assets",
        Some(&alice),
        Some(json!({ "name": "Tripod", "category": "support" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let item_id = register_camera(&app, &custodian).await;
    let id = request_window(&app, &alice, item_id, "2024-06-01", "2024-06-05").await;
    let (status, _) = send(&app, "POST", &format!("/reservations/{}/approve", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_full_custody_cycle() {
    let (app, config) = test_app();
    let custodian = token(&config, CUSTODIAN_ID, AccessTier::Custodian);
    let alice = token(&config, ALICE_ID, AccessTier::Requester);
    let bob = token(&config, BOB_ID, AccessTier::Requester);

    let item_id = register_camera(&app, &custodian).await;
    let r1 = request_window(&app, &alice, item_id, "2024-06-01", "2024-06-05").await;
    let r2 = request_window(&app, &bob, item_id, "2024-06-03", "2024-06-04").await;

    // Approve R1, then R2 overlaps it
    let (status, body) = send(&app, "POST", &format!("/reservations/{}/approve", r1), Some(&custodian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(&app, "POST", &format!("/reservations/{}/approve", r2), Some(&custodian), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = send(&app, "GET", &format!("/reservations/{}", r2), Some(&custodian), None).await;
    assert_eq!(body["status"], "pending");

    let (_, body) = send(&app, "GET", &format!("/assets/{}", item_id), Some(&alice), None).await;
    assert_eq!(body["status"], "reserved");

    // Pickup
    let (status, body) = send(&app, "GET", "/reservations/due/pickup?date=2024-06-01", Some(&custodian), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"].as_i64(), Some(r1));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/reservations/{}/receipt", r1),
        Some(&custodian),
        Some(json!({ "condition": "damage", "notes": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/reservations/{}/receipt", r1),
        Some(&custodian),
        Some(json!({ "condition": "good" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["asset"]["status"], "in_use");
    assert_eq!(body["reservation"]["item_condition_on_receive"], "good");

    let (_, body) = send(&app, "GET", "/reservations/due/pickup?date=2024-06-01", Some(&custodian), None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Return
    let (_, body) = send(&app, "GET", "/reservations/due/return?date=2024-06-06", Some(&custodian), None).await;
    assert_eq!(body[0]["id"].as_i64(), Some(r1));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/reservations/{}/return", r1),
        Some(&custodian),
        Some(json!({ "condition": "damage", "notes": "cracked lens" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reservation"]["status"], "completed");
    assert_eq!(body["reservation"]["return_notes"], "cracked lens");
    assert_eq!(body["asset"]["status"], "maintenance");

    let (_, body) = send(&app, "GET", "/reservations/due/return?date=2024-06-06", Some(&custodian), None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));

    // Terminal
    let (status, _) = send(
        &app,
        "POST",
        &format!("/reservations/{}/return", r1),
        Some(&custodian),
        Some(json!({ "condition": "good" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", &format!("/reservations/{}", r1), Some(&alice), None).await;
    assert_eq!(body["condition_records"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["condition_records"][1]["recorded_by"], CUSTODIAN_ID);

    // Back in service
    let (status, body) = send(
        &app,
        "POST",
        &format!("/assets/{}/maintenance/complete", item_id),
        Some(&custodian),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
}

#[tokio::test]
async fn test_requesters_only_see_their_own_reservations() {
    let (app, config) = test_app();
    let custodian = token(&config, CUSTODIAN_ID, AccessTier::Custodian);
    let alice = token(&config, ALICE_ID, AccessTier::Requester);
    let bob = token(&config, BOB_ID, AccessTier::Requester);

    let item_id = register_camera(&app, &custodian).await;
    let mine = request_window(&app, &alice, item_id, "2024-06-01", "2024-06-02").await;
    let theirs = request_window(&app, &bob, item_id, "2024-06-01", "2024-06-02").await;

    let (_, body) = send(
        &app,
        "GET",
        &format!("/reservations?requester_id={}", BOB_ID),
        Some(&alice),
        None,
    )
    .await;
    let ids: Vec<i64> = body
        .as_array()
        .expect("Expected a list")
        .iter()
        .filter_map(|r| r["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![mine]);

    let (status, _) = send(&app, "GET", &format!("/reservations/{}", theirs), Some(&alice), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = send(&app, "GET", "/reservations", Some(&custodian), None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_only_the_requester_can_cancel() {
    let (app, config) = test_app();
    let custodian = token(&config, CUSTODIAN_ID, AccessTier::Custodian);
    let alice = token(&config, ALICE_ID, AccessTier::Requester);
    let bob = token(&config, BOB_ID, AccessTier::Requester);

    let item_id = register_camera(&app, &custodian).await;
    let id = request_window(&app, &alice, item_id, "2024-06-01", "2024-06-02").await;

    let (status, _) = send(&app, "POST", &format!("/reservations/{}/cancel", id), Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "POST", &format!("/reservations/{}/cancel", id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
}

#[tokio::test]
async fn test_invalid_window_and_unknown_asset() {
    let (app, config) = test_app();
    let custodian = token(&config, CUSTODIAN_ID, AccessTier::Custodian);
    let alice = token(&config, ALICE_ID, AccessTier::Requester);
    let item_id = register_camera(&app, &custodian).await;

    let (status, _) = send(
        &app,
        "POST",
        "/reservations",
        Some(&alice),
        Some(json!({ "item_id": item_id, "start_date": "2024-06-05", "end_date": "2024-06-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/reservations",
        Some(&alice),
        Some(json!({ "item_id": 999, "start_date": "2024-06-01", "end_date": "2024-06-02" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_live_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_live_list_assets() {
    let client = Client::new();
    let config = AppConfig::load().expect("Failed to load configuration");
    let token = token(&config, CUSTODIAN_ID, AccessTier::Custodian);

    let response = client
        .get(format!("{}/assets", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}
