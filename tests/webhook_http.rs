//! End-to-end tests for the webhook endpoint: signature middleware, event
//! routing, and response taxonomy, exercised through the real router.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use gitpulse::store::{EntityStore, MemoryStore};
use gitpulse::webhook::{sign_payload, webhook_router};
use gitpulse::AppState;

const SECRET: &str = "integration-test-secret";

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(store.clone(), SECRET.to_string()));
    let app = webhook_router(state.clone()).with_state(state);
    (app, store)
}

fn installation_created() -> Vec<u8> {
    serde_json::to_vec(&json!({
        "action": "created",
        "installation": {
            "account": { "id": 1001, "login": "acme-org" }
        },
        "repositories": [
            { "id": 2001, "name": "backend" }
        ]
    }))
    .expect("fixture should serialize")
}

fn signed_request(event: &str, body: Vec<u8>) -> Request<Body> {
    let signature = sign_payload(SECRET, &body);
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-github-event", event)
        .header("x-hub-signature-256", signature)
        .body(Body::from(body))
        .expect("request should build")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

#[tokio::test]
async fn test_valid_delivery_is_processed() {
    let (app, store) = test_app();

    let response = app
        .oneshot(signed_request("installation", installation_created()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "processed");

    let org = store.find_organization(1001).await.unwrap().unwrap();
    assert_eq!(org.login, "acme-org");
}

#[tokio::test]
async fn test_invalid_signature_is_rejected_before_processing() {
    let (app, store) = test_app();

    let body = installation_created();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-github-event", "installation")
        .header("x-hub-signature-256", sign_payload("wrong-secret", &body))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let (app, store) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-github-event", "installation")
        .body(Body::from(installation_created()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_unknown_event_is_acknowledged() {
    let (app, store) = test_app();

    let body = serde_json::to_vec(&json!({ "action": "created" })).unwrap();
    let response = app
        .oneshot(signed_request("deployment", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ignored");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_missing_event_header_is_a_bad_request() {
    let (app, _store) = test_app();

    let body = installation_created();
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("content-type", "application/json")
        .header("x-hub-signature-256", sign_payload(SECRET, &body))
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_payload_for_known_event_is_a_bad_request() {
    let (app, store) = test_app();

    let body = br#"{"action":"opened"}"#.to_vec();
    let response = app
        .oneshot(signed_request("pull_request", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["status"], "rejected");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_redelivered_event_converges() {
    let (app, store) = test_app();

    let first = app
        .clone()
        .oneshot(signed_request("installation", installation_created()))
        .await
        .unwrap();
    let second = app
        .oneshot(signed_request("installation", installation_created()))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert!(store.find_repository(2001).await.unwrap().is_some());
}
