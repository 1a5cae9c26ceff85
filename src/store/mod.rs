//! Persistence gateway for the entity graph.
//!
//! This module defines the `EntityStore` trait that abstracts keyed upsert,
//! lookup, and conditional-update operations per entity type. Implementations
//! provide different backends: SQLite for production, in-memory for tests.
//!
//! Every operation must be atomic with respect to its natural key: two
//! concurrent upserts for the same key serialize to one of the writes
//! winning, and the set-once timestamp transition is a single atomic
//! "write only if currently null", never a read followed by a write.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    Commit, Contributor, Organization, PrReview, PullRequest, PullRequestState, Repository,
};

/// Failures surfaced by a store backend.
///
/// Handlers do not retry these: the webhook sender's redelivery-on-5xx is
/// the retry mechanism, and every reconciliation cascade is idempotent.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage failure during {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt row: {what}")]
    Corruption { what: String },
}

impl StoreError {
    pub fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        StoreError::Storage {
            operation,
            message: message.into(),
        }
    }

    pub fn corruption(what: impl Into<String>) -> Self {
        StoreError::Corruption { what: what.into() }
    }
}

/// The two set-once pull request timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrTimestampField {
    FirstReview,
    Approved,
}

impl PrTimestampField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            PrTimestampField::FirstReview => "first_review_at",
            PrTimestampField::Approved => "approved_at",
        }
    }
}

/// Field set for a pull request upsert.
///
/// Everything here is replaced on conflict; the set-once timestamps are
/// deliberately absent and can only be written through
/// `set_pr_timestamp_if_absent`.
#[derive(Debug, Clone)]
pub struct PullRequestUpsert {
    pub github_id: u64,
    pub repository_id: Uuid,
    pub author_id: Uuid,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PullRequestState,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Field set for a review upsert, keyed on the review's provider id.
#[derive(Debug, Clone)]
pub struct ReviewUpsert {
    pub github_id: u64,
    pub pull_request_id: Uuid,
    pub reviewer_id: Uuid,
    pub state: String,
    pub submitted_at: DateTime<Utc>,
}

/// Field set for a commit upsert, keyed on the sha.
#[derive(Debug, Clone)]
pub struct CommitUpsert {
    pub sha: String,
    pub repository_id: Uuid,
    pub author_id: Option<Uuid>,
    pub message: String,
    pub committed_at: DateTime<Utc>,
}

/// Keyed persistence operations consumed by the reconciliation handlers.
///
/// Upserts return the stored entity so that the caller can thread local ids
/// through the rest of its cascade; they never create a second row for a
/// natural key that already exists.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Upsert an organization by provider id. Refreshes the login; the
    /// activity flag is preserved on existing rows (inserts default to
    /// active) — only `deactivate_organization` changes it.
    async fn upsert_organization(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Organization, StoreError>;

    /// Soft-deactivate an organization. Missing rows are a no-op.
    async fn deactivate_organization(&self, github_id: u64) -> Result<(), StoreError>;

    async fn find_organization(&self, github_id: u64) -> Result<Option<Organization>, StoreError>;

    /// Upsert a repository by provider id, refreshing name and owner.
    async fn upsert_repository(
        &self,
        github_id: u64,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Repository, StoreError>;

    /// Hard-delete a repository by provider id. Returns whether a row was
    /// removed.
    async fn delete_repository(&self, github_id: u64) -> Result<bool, StoreError>;

    async fn find_repository(&self, github_id: u64) -> Result<Option<Repository>, StoreError>;

    /// Upsert a contributor by full provider identity. Resolution order:
    /// a row with this `github_id` (login refreshed), else a login-only row
    /// with this login (claimed by attaching the `github_id`), else a fresh
    /// insert. The claim step is what keeps the commit-authorship creation
    /// path from colliding with this one.
    async fn upsert_contributor(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Contributor, StoreError>;

    /// Upsert a contributor by login alone (commit authorship carries no
    /// numeric identity). Reuses any existing row for the login, preferring
    /// one that already has a provider id.
    async fn upsert_contributor_by_login(&self, login: &str) -> Result<Contributor, StoreError>;

    async fn find_contributor_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Contributor>, StoreError>;

    /// Upsert a pull request keyed on `(repository_id, number)`. Replaces
    /// the mutable field set; never touches `first_review_at`/`approved_at`.
    async fn upsert_pull_request(
        &self,
        upsert: PullRequestUpsert,
    ) -> Result<PullRequest, StoreError>;

    /// Look up a pull request by its compound natural key.
    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: u64,
    ) -> Result<Option<PullRequest>, StoreError>;

    async fn upsert_review(&self, upsert: ReviewUpsert) -> Result<PrReview, StoreError>;

    /// Atomically set a set-once pull request timestamp if it is currently
    /// null. Returns true when this call performed the write, false when
    /// the field was already set (the existing value is left untouched).
    async fn set_pr_timestamp_if_absent(
        &self,
        pull_request_id: Uuid,
        field: PrTimestampField,
        value: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn upsert_commit(&self, upsert: CommitUpsert) -> Result<Commit, StoreError>;

    async fn find_commit(&self, sha: &str) -> Result<Option<Commit>, StoreError>;
}
