//! Serde views of the webhook payloads.
//!
//! Only the fields the handlers actually read are declared; everything else
//! in the delivered JSON is ignored. Fields the sender omits on some
//! variants of an event are defaulted rather than required, so that an
//! unhandled action never fails deserialization before we can skip it.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A user or organization account, as embedded throughout the payloads.
#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: u64,
    pub login: String,
}

/// The abbreviated repository shape used in installation payloads.
#[derive(Debug, Deserialize)]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Installation {
    pub account: Account,
}

#[derive(Debug, Deserialize)]
pub struct InstallationPayload {
    pub action: String,
    pub installation: Installation,
    /// Present on `created`; absent on `deleted`.
    #[serde(default)]
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Deserialize)]
pub struct InstallationRepositoriesPayload {
    pub installation: Installation,
    #[serde(default)]
    pub repositories_added: Vec<RepositorySummary>,
    #[serde(default)]
    pub repositories_removed: Vec<RepositorySummary>,
}

/// The full repository shape carried by pull request, review, and push
/// payloads. The owner account doubles as the organization identity.
#[derive(Debug, Deserialize)]
pub struct RepositoryDetails {
    pub id: u64,
    pub name: String,
    pub owner: Account,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestDetails {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// Raw provider state: only ever `open` or `closed`. The merged flag
    /// below disambiguates closed-merged from closed-unmerged.
    pub state: String,
    #[serde(default)]
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub additions: u64,
    #[serde(default)]
    pub deletions: u64,
    #[serde(default)]
    pub changed_files: u64,
    pub created_at: DateTime<Utc>,
    pub user: Account,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub pull_request: PullRequestDetails,
    pub repository: RepositoryDetails,
}

#[derive(Debug, Deserialize)]
pub struct ReviewDetails {
    pub id: u64,
    pub state: String,
    /// Absent on a pending review; always present once submitted.
    pub submitted_at: Option<DateTime<Utc>>,
    pub user: Account,
}

/// Review payloads reference the pull request by number only.
#[derive(Debug, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub action: String,
    pub review: ReviewDetails,
    pub pull_request: PullRequestRef,
    pub repository: RepositoryDetails,
}

/// Commit authorship in push payloads is a git identity, not an account:
/// the username is only present when the sender could resolve one.
#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PushCommit {
    /// The commit sha.
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
pub struct PushPayload {
    pub repository: RepositoryDetails,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}
