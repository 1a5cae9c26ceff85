//! Webhook HTTP surface: signature verification middleware and the event
//! handler.
//!
//! Signature verification runs as route-layer middleware over the raw body
//! bytes, before any JSON parsing. The handler itself never sees an
//! unauthenticated payload.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{error, warn};

use crate::ingest::{self, IngestError, IngestOutcome};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Verify a `sha256=<hex>` signature over the raw payload bytes.
pub fn verify_github_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let signature_bytes = match hex::decode(hex_digest) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    // Constant-time comparison.
    mac.verify_slice(&signature_bytes).is_ok()
}

/// Compute the `sha256=<hex>` signature a sender would attach to a payload.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(payload);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

async fn verify_webhook_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();

    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let signature = parts
        .headers
        .get("x-hub-signature-256")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("webhook delivery without signature header");
            StatusCode::UNAUTHORIZED
        })?;

    if !verify_github_signature(&state.webhook_secret, &bytes, signature) {
        warn!("invalid webhook signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    // The body was consumed for verification; rebuild the request so the
    // handler can read the same bytes.
    let new_request = Request::from_parts(parts, axum::body::Body::from(bytes));
    Ok(next.run(new_request).await)
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

impl WebhookResponse {
    fn processed() -> Self {
        Self {
            status: "processed",
            reason: None,
        }
    }

    fn ignored(reason: &'static str) -> Self {
        Self {
            status: "ignored",
            reason: Some(reason),
        }
    }

    fn rejected(reason: &'static str) -> Self {
        Self {
            status: "rejected",
            reason: Some(reason),
        }
    }
}

async fn github_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(event) = headers
        .get("x-github-event")
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookResponse::rejected("missing X-GitHub-Event header")),
        )
            .into_response();
    };

    match ingest::handle_event(state.store.as_ref(), &event, &body).await {
        Ok(IngestOutcome::Processed) => {
            (StatusCode::OK, Json(WebhookResponse::processed())).into_response()
        }
        Ok(IngestOutcome::Ignored(reason)) => {
            (StatusCode::OK, Json(WebhookResponse::ignored(reason))).into_response()
        }
        Err(err @ IngestError::Payload { .. }) => {
            warn!(%event, error = %err, "rejecting malformed payload");
            (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse::rejected("malformed payload")),
            )
                .into_response()
        }
        Err(IngestError::Store(err)) => {
            // 500 so the sender redelivers; the cascade is idempotent.
            error!(%event, error = %err, "store failure while processing webhook");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn webhook_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", post(github_webhook_handler))
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            verify_webhook_signature,
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test-webhook-secret";

    #[test]
    fn test_valid_signature_verifies() {
        let payload = br#"{"action":"opened"}"#;
        let signature = sign_payload(SECRET, payload);

        assert!(verify_github_signature(SECRET, payload, &signature));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = br#"{"action":"opened"}"#;
        let signature = sign_payload("other-secret", payload);

        assert!(!verify_github_signature(SECRET, payload, &signature));
    }

    #[test]
    fn test_missing_prefix_fails() {
        let payload = br#"{"action":"opened"}"#;
        let signature = sign_payload(SECRET, payload);
        let bare = signature.strip_prefix("sha256=").unwrap();

        assert!(!verify_github_signature(SECRET, payload, bare));
    }

    #[test]
    fn test_non_hex_signature_fails() {
        assert!(!verify_github_signature(
            SECRET,
            b"payload",
            "sha256=not-hex-at-all"
        ));
    }

    #[test]
    fn test_empty_signature_fails() {
        assert!(!verify_github_signature(SECRET, b"payload", ""));
        assert!(!verify_github_signature(SECRET, b"payload", "sha256="));
    }

    proptest! {
        #[test]
        fn prop_signature_over_mutated_payload_fails(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            flip_index in any::<prop::sample::Index>(),
        ) {
            let signature = sign_payload(SECRET, &payload);

            let mut mutated = payload.clone();
            let index = flip_index.index(mutated.len());
            mutated[index] ^= 0x01;

            prop_assert!(verify_github_signature(SECRET, &payload, &signature));
            prop_assert!(!verify_github_signature(SECRET, &mutated, &signature));
        }

        #[test]
        fn prop_signature_does_not_transfer_between_secrets(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
            secret_a in "[a-z]{8,32}",
            secret_b in "[A-Z]{8,32}",
        ) {
            let signature = sign_payload(&secret_a, &payload);
            prop_assert!(!verify_github_signature(&secret_b, &payload, &signature));
        }
    }
}
