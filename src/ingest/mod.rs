//! Webhook event routing and reconciliation.
//!
//! `handle_event` maps an event tag to its handler and runs the handler's
//! reconciliation cascade against the store. Every cascade is idempotent:
//! redelivering the same payload converges to the same entity graph, so the
//! webhook sender's retry-on-failure needs no dedup on our side.

mod installation;
mod payload;
mod pull_request;
mod push;
mod review;


use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

use crate::store::{EntityStore, StoreError};

/// The event types this service reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Installation,
    InstallationRepositories,
    PullRequest,
    PullRequestReview,
    Push,
}

/// Static routing table from the `X-GitHub-Event` header value.
const ROUTES: &[(&str, EventKind)] = &[
    ("installation", EventKind::Installation),
    (
        "installation_repositories",
        EventKind::InstallationRepositories,
    ),
    ("pull_request", EventKind::PullRequest),
    ("pull_request_review", EventKind::PullRequestReview),
    ("push", EventKind::Push),
];

impl EventKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        ROUTES
            .iter()
            .find(|(candidate, _)| *candidate == tag)
            .map(|(_, kind)| *kind)
    }
}

/// What happened to a delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The event's cascade ran and the graph was reconciled.
    Processed,
    /// The event was deliberately skipped; the reason is logged and echoed
    /// back in the response body.
    Ignored(&'static str),
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// The payload for a routed event did not match its expected shape.
    /// This maps to a 400: redelivering the same bytes cannot succeed.
    #[error("malformed {event} payload: {source}")]
    Payload {
        event: &'static str,
        source: serde_json::Error,
    },

    /// A store operation failed. This maps to a 500 so the sender redelivers.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn decode<T: DeserializeOwned>(event: &'static str, body: &[u8]) -> Result<T, IngestError> {
    serde_json::from_slice(body).map_err(|source| IngestError::Payload { event, source })
}

/// Route one delivered event to its reconciliation handler.
///
/// Unknown event tags are acknowledged without touching the store, so that
/// broadening the webhook subscription upstream never causes redelivery
/// storms against this service.
pub async fn handle_event(
    store: &dyn EntityStore,
    tag: &str,
    body: &[u8],
) -> Result<IngestOutcome, IngestError> {
    let Some(kind) = EventKind::from_tag(tag) else {
        info!(event = tag, "ignoring unhandled event type");
        return Ok(IngestOutcome::Ignored("unhandled event type"));
    };

    match kind {
        EventKind::Installation => {
            installation::handle_installation(store, decode("installation", body)?).await
        }
        EventKind::InstallationRepositories => {
            installation::handle_installation_repositories(
                store,
                decode("installation_repositories", body)?,
            )
            .await
        }
        EventKind::PullRequest => {
            pull_request::handle(store, decode("pull_request", body)?).await
        }
        EventKind::PullRequestReview => {
            review::handle(store, decode("pull_request_review", body)?).await
        }
        EventKind::Push => push::handle(store, decode("push", body)?).await,
    }
}
