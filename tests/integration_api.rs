//! HTTP API Integration Tests
//!
//! Drives the full router (CORS, request logging, error mapping) against
//! the in-process store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

fn transfer_request(id: Uuid, source: u64, dest: u64, amount: u64) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/transfers")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "id": id, "source": source, "dest": dest, "amount": amount }).to_string(),
        ))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = common::app_for(&common::scenario_store());

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_transfer_e2e() {
    let store = common::scenario_store();
    let app = common::app_for(&store);
    let id = Uuid::new_v4();

    // 1. Transfer 250 from #1 to #2
    let response = app.clone().oneshot(transfer_request(id, 1, 2, 250)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::read_json(response).await, json!({}));

    // 2. Balances
    let response = app.clone().oneshot(get("/api/v1/accounts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    assert_eq!(
        body,
        json!({ "accounts": [
            { "number": 1, "balance": 750 },
            { "number": 2, "balance": 2250 }
        ]})
    );

    // 3. History of the sender
    let response = app
        .clone()
        .oneshot(get("/api/v1/accounts/1/transfers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::read_json(response).await;
    let transfers = body["transfers"].as_array().unwrap();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0]["id"], id.to_string());
    assert_eq!(transfers[0]["account"], 1);
    assert_eq!(transfers[0]["toAccount"], 2);
    assert!(transfers[0].get("fromAccount").is_none());
    assert_eq!(transfers[0]["amount"], 250);
    assert_eq!(transfers[0]["direction"], "outgoing");
    assert!(transfers[0]["createdAt"].is_string());

    // 4. History of the recipient
    let response = app
        .oneshot(get("/api/v1/accounts/2/transfers"))
        .await
        .unwrap();
    let body = common::read_json(response).await;
    assert_eq!(body["transfers"][0]["direction"], "incoming");
    assert_eq!(body["transfers"][0]["fromAccount"], 1);
}

#[tokio::test]
async fn test_idempotency_api() {
    let store = common::scenario_store();
    let app = common::app_for(&store);
    let id = Uuid::new_v4();

    let response = app.clone().oneshot(transfer_request(id, 1, 2, 100)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(transfer_request(id, 1, 2, 100)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::read_json(response).await;
    assert_eq!(body["error_code"], "transfer_already_complete");

    assert_eq!(store.balance(1u64), Some(900));
    assert_eq!(store.transfers().len(), 1);
}

#[tokio::test]
async fn test_domain_errors_are_bad_requests() {
    let store = common::scenario_store();
    let app = common::app_for(&store);

    let cases: [(u64, u64, u64, &str); 4] = [
        (1, 2, 1250, "not_enough_money"),
        (99, 2, 10, "invalid_account"),
        (1, 1, 10, "same_account"),
        (1, 2, 0, "invalid_amount"),
    ];

    for (source, dest, amount, code) in cases {
        let response = app
            .clone()
            .oneshot(transfer_request(Uuid::new_v4(), source, dest, amount))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case {}", code);

        let body: Value = common::read_json(response).await;
        assert_eq!(body["error_code"], code);
        assert!(body["error"].is_string());
    }

    assert_eq!(store.total_balance(), 3000);
    assert!(store.transfers().is_empty());
}

#[tokio::test]
async fn test_database_error_is_server_error() {
    let store = common::scenario_store();
    store.fail_next_begin();
    let app = common::app_for(&store);

    let response = app
        .oneshot(transfer_request(Uuid::new_v4(), 1, 2, 10))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = common::read_json(response).await;
    assert_eq!(body["error_code"], "database_error");
}

#[tokio::test]
async fn test_history_of_unknown_account() {
    let app = common::app_for(&common::scenario_store());

    let response = app
        .oneshot(get("/api/v1/accounts/99/transfers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::read_json(response).await;
    assert_eq!(body["error_code"], "invalid_account");
    assert_eq!(body["error"], "Account with number [99] not found");
}

#[tokio::test]
async fn test_non_numeric_account_is_rejected() {
    let app = common::app_for(&common::scenario_store());

    let response = app
        .oneshot(get("/api/v1/accounts/abc/transfers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = common::read_json(response).await;
    assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn test_malformed_body_is_client_error() {
    let store = common::scenario_store();
    let app = common::app_for(&store);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/transfers")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"id": "not-a-uuid", "source": 1}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = common::app_for(&common::scenario_store());

    let request = Request::builder()
        .uri("/api/v1/accounts")
        .header("x-request-id", "trace-123")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = common::app_for(&common::scenario_store());

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/transfers")
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
