//! Entity types for the reconciled contribution graph.
//!
//! Every entity carries the provider-assigned identity (`github_id`) it is
//! deduplicated on, plus a locally generated `local_id` used for foreign-key
//! references between entities. Upserts always key on the provider identity,
//! never on the local id, so redelivered events converge to the same rows.

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub local_id: Uuid,
    pub github_id: u64,
    pub login: String,
    /// Flipped to false when the installation is deleted. Organizations are
    /// never hard-deleted; their history stays queryable.
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub local_id: Uuid,
    pub github_id: u64,
    pub organization_id: Uuid,
    pub name: String,
}

/// A contributor, created either with full identity (PR and review actors)
/// or by login alone (commit authorship, where the payload carries only a
/// username string). `github_id` is `None` until a full-identity event
/// claims the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contributor {
    pub local_id: Uuid,
    pub github_id: Option<u64>,
    pub login: String,
}

/// Local pull request state. This is a three-way mapping, not a copy of the
/// provider's raw `state` field: a merged PR reports `closed` upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

impl PullRequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
            PullRequestState::Merged => "merged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(PullRequestState::Open),
            "closed" => Some(PullRequestState::Closed),
            "merged" => Some(PullRequestState::Merged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub local_id: Uuid,
    pub github_id: u64,
    pub repository_id: Uuid,
    pub author_id: Uuid,
    /// Unique per repository; the natural key reviews join on, since review
    /// payloads carry the number but not the PR's provider id.
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: PullRequestState,
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    /// Set-once: written by the first review ever observed, then immutable.
    pub first_review_at: Option<DateTime<Utc>>,
    /// Set-once: written by the first approving review, then immutable.
    pub approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReview {
    pub local_id: Uuid,
    pub github_id: u64,
    pub pull_request_id: Uuid,
    pub reviewer_id: Uuid,
    pub state: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Natural key; there is no separate local id for commits.
    pub sha: String,
    pub repository_id: Uuid,
    /// None when the push payload carries no resolvable username for the
    /// commit author.
    pub author_id: Option<Uuid>,
    pub message: String,
    pub committed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pull_request_state_roundtrip() {
        for state in [
            PullRequestState::Open,
            PullRequestState::Closed,
            PullRequestState::Merged,
        ] {
            assert_eq!(PullRequestState::parse(state.as_str()), Some(state));
        }
    }

    #[test]
    fn test_pull_request_state_rejects_unknown() {
        assert_eq!(PullRequestState::parse("draft"), None);
        assert_eq!(PullRequestState::parse(""), None);
    }
}
