//! API Integration Tests
//!
//! Drives the full router, middleware included, over in-memory stores.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use event_ledger::api;
use event_ledger::domain::Event;
use event_ledger::event_store::{AggregateOperation, EventStore, InMemoryEventStore};
use event_ledger::snapshot::InMemorySnapshotStore;
use event_ledger::{LedgerService, Metrics, RetryPolicy};

fn test_app() -> (Router, InMemoryEventStore) {
    let (app, events, _) = test_app_with_metrics();
    (app, events)
}

fn test_app_with_metrics() -> (Router, InMemoryEventStore, Arc<Metrics>) {
    let events = InMemoryEventStore::new();
    let metrics = Arc::new(Metrics::new().unwrap());
    let ledger = LedgerService::new(events.clone(), InMemorySnapshotStore::new())
        .with_retry_policy(RetryPolicy::without_delay(5))
        .with_metrics(metrics.clone());
    (api::build_app(ledger, metrics.clone(), "*"), events, metrics)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn fund(events: &InMemoryEventStore, account_id: &str, version: i64) {
    let event = Event::transaction_posted(
        format!("deposit-{account_id}"),
        account_id,
        "deposit",
        dec!(100),
        "External deposit".to_string(),
        Utc::now(),
    );
    events
        .append(vec![AggregateOperation::new(account_id, version, vec![event])])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = test_app();

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_transfer_e2e() {
    let (app, events) = test_app();

    // 1. Create accounts
    let (status, body) = send(&app, post_json("/api/v1/accounts", json!({ "id": "A", "owner": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED, "Account A creation failed");
    assert_eq!(body, json!({ "status": "created", "id": "A" }));

    let (status, _) = send(&app, post_json("/api/v1/accounts", json!({ "id": "B", "owner": "bob" }))).await;
    assert_eq!(status, StatusCode::CREATED, "Account B creation failed");

    // 2. Transfer without funds
    let transfer = json!({ "tx_id": "tx1", "from_account": "A", "to_account": "B", "amount": "50.00" });
    let (status, body) = send(&app, post_json("/api/v1/transactions", transfer)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "insufficient_funds");

    // 3. Fund A and transfer
    fund(&events, "A", 1).await;

    let transfer = json!({ "tx_id": "tx2", "from_account": "A", "to_account": "B", "amount": 50 });
    let (status, body) = send(&app, post_json("/api/v1/transactions", transfer)).await;
    assert_eq!(status, StatusCode::OK, "Transfer failed: {body}");
    assert_eq!(body["status"], "accepted");
    assert_eq!(body["tx_id"], "tx2");
    assert_eq!(body["attempts"], 1);

    // 4. Check balances
    let (status, body) = send(&app, get("/api/v1/accounts/A")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"], "alice");
    assert_eq!(body["balance"], "50");
    assert_eq!(body["version"], 3);

    let (_, body) = send(&app, get("/api/v1/accounts/B")).await;
    assert_eq!(body["balance"], "50");
    assert_eq!(body["version"], 2);

    // 5. History
    let (status, body) = send(&app, get("/api/v1/accounts/A/events")).await;
    assert_eq!(status, StatusCode::OK);
    let history = body["events"].as_array().unwrap();
    let kinds: Vec<_> = history.iter().map(|e| e["event_type"].as_str().unwrap()).collect();
    assert_eq!(kinds, ["ACCOUNT_CREATED", "TXN_POSTED", "TXN_POSTED"]);
    assert_eq!(history[2]["event_id"], "tx2-dr");
    assert_eq!(history[2]["payload"]["reference"], "Transfer to B");
}

#[tokio::test]
async fn test_duplicate_account_conflict() {
    let (app, _) = test_app();

    let (status, _) = send(&app, post_json("/api/v1/accounts", json!({ "id": "A", "owner": "alice" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, post_json("/api/v1/accounts", json!({ "id": "A", "owner": "eve" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "account_exists");
}

#[tokio::test]
async fn test_unknown_account_not_found() {
    let (app, _) = test_app();

    let (status, body) = send(&app, get("/api/v1/accounts/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "account_not_found");

    let (status, body) = send(&app, get("/api/v1/accounts/ghost/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"], json!([]));
}

#[tokio::test]
async fn test_transfer_to_unknown_account() {
    let (app, events) = test_app();

    send(&app, post_json("/api/v1/accounts", json!({ "id": "A", "owner": "alice" }))).await;
    fund(&events, "A", 1).await;

    let transfer = json!({ "tx_id": "tx1", "from_account": "A", "to_account": "ghost", "amount": 1 });
    let (status, body) = send(&app, post_json("/api/v1/transactions", transfer)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "ghost");
}

#[tokio::test]
async fn test_invalid_transfer_requests() {
    let (app, _) = test_app();

    for amount in [json!(0), json!("-5"), json!("0.000000001")] {
        let transfer = json!({ "tx_id": "tx1", "from_account": "A", "to_account": "B", "amount": amount });
        let (status, body) = send(&app, post_json("/api/v1/transactions", transfer)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount} accepted");
        assert_eq!(body["error_code"], "invalid_request");
    }

    let same = json!({ "tx_id": "tx1", "from_account": "A", "to_account": "A", "amount": 1 });
    let (status, _) = send(&app, post_json("/api/v1/transactions", same)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, post_json("/api/v1/transactions", json!({ "tx_id": "tx1" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");

    let malformed = Request::builder()
        .method("POST")
        .uri("/api/v1/accounts")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, _) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (app, _) = test_app();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-abc");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (app, _) = test_app();

    for request in [get("/healthz"), get("/api/v1/accounts/ghost")] {
        let response = app.clone().oneshot(request).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["referrer-policy"], "no-referrer");
        assert!(headers.contains_key("content-security-policy"));
    }
}

#[tokio::test]
async fn test_healthz_alias() {
    let (app, _) = test_app();

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_metrics_endpoint_reports_requests_and_transfers() {
    let (app, events, metrics) = test_app_with_metrics();

    send(&app, post_json("/api/v1/accounts", json!({ "id": "A", "owner": "alice" }))).await;
    send(&app, post_json("/api/v1/accounts", json!({ "id": "B", "owner": "bob" }))).await;
    fund(&events, "A", 1).await;
    let transfer = json!({ "tx_id": "tx1", "from_account": "A", "to_account": "B", "amount": 5 });
    let (status, _) = send(&app, post_json("/api/v1/transactions", transfer)).await;
    assert_eq!(status, StatusCode::OK);

    let response = api::metrics_router(metrics)
        .oneshot(get("/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8(body.to_vec()).unwrap();
    assert!(body.contains("ledger_transfers_committed_total 1"));
    assert!(body.contains(r#"path="/api/v1/transactions""#));
    assert!(body.contains(r#"path="/api/v1/accounts""#));
}
