//! In-memory implementation of `EntityStore`.
//!
//! Used by tests and useful for local runs; all state is lost on restart.
//! Every operation takes a single write guard over the whole graph, which
//! gives it the same per-key atomicity the SQLite backend provides — in
//! particular `set_pr_timestamp_if_absent` checks and writes under one
//! guard, so two concurrent callers can never both observe null.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CommitUpsert, EntityStore, PrTimestampField, PullRequestUpsert, ReviewUpsert, StoreError,
};
use crate::model::{Commit, Contributor, Organization, PrReview, PullRequest, Repository};

#[derive(Default)]
struct Graph {
    organizations: HashMap<u64, Organization>,
    repositories: HashMap<u64, Repository>,
    contributors: Vec<Contributor>,
    pull_requests: Vec<PullRequest>,
    reviews: HashMap<u64, PrReview>,
    commits: HashMap<String, Commit>,
}

/// In-memory entity store.
pub struct MemoryStore {
    graph: RwLock<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(Graph::default()),
        }
    }

    /// Number of contributor rows, across both creation paths.
    /// Test-observability helper.
    pub async fn contributor_count(&self) -> usize {
        self.graph.read().await.contributors.len()
    }

    /// Number of pull request rows. Test-observability helper.
    pub async fn pull_request_count(&self) -> usize {
        self.graph.read().await.pull_requests.len()
    }

    /// Number of review rows. Test-observability helper.
    pub async fn review_count(&self) -> usize {
        self.graph.read().await.reviews.len()
    }

    /// True when no entity of any type has been written.
    pub async fn is_empty(&self) -> bool {
        let graph = self.graph.read().await;
        graph.organizations.is_empty()
            && graph.repositories.is_empty()
            && graph.contributors.is_empty()
            && graph.pull_requests.is_empty()
            && graph.reviews.is_empty()
            && graph.commits.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn upsert_organization(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Organization, StoreError> {
        let mut graph = self.graph.write().await;
        let org = graph
            .organizations
            .entry(github_id)
            .and_modify(|org| org.login = login.to_string())
            .or_insert_with(|| Organization {
                local_id: Uuid::new_v4(),
                github_id,
                login: login.to_string(),
                is_active: true,
            });
        Ok(org.clone())
    }

    async fn deactivate_organization(&self, github_id: u64) -> Result<(), StoreError> {
        let mut graph = self.graph.write().await;
        if let Some(org) = graph.organizations.get_mut(&github_id) {
            org.is_active = false;
        }
        Ok(())
    }

    async fn find_organization(&self, github_id: u64) -> Result<Option<Organization>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph.organizations.get(&github_id).cloned())
    }

    async fn upsert_repository(
        &self,
        github_id: u64,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Repository, StoreError> {
        let mut graph = self.graph.write().await;
        let repo = graph
            .repositories
            .entry(github_id)
            .and_modify(|repo| {
                repo.organization_id = organization_id;
                repo.name = name.to_string();
            })
            .or_insert_with(|| Repository {
                local_id: Uuid::new_v4(),
                github_id,
                organization_id,
                name: name.to_string(),
            });
        Ok(repo.clone())
    }

    async fn delete_repository(&self, github_id: u64) -> Result<bool, StoreError> {
        let mut graph = self.graph.write().await;
        Ok(graph.repositories.remove(&github_id).is_some())
    }

    async fn find_repository(&self, github_id: u64) -> Result<Option<Repository>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph.repositories.get(&github_id).cloned())
    }

    async fn upsert_contributor(
        &self,
        github_id: u64,
        login: &str,
    ) -> Result<Contributor, StoreError> {
        let mut graph = self.graph.write().await;

        if let Some(contributor) = graph
            .contributors
            .iter_mut()
            .find(|c| c.github_id == Some(github_id))
        {
            contributor.login = login.to_string();
            return Ok(contributor.clone());
        }

        // Claim a login-only row left behind by commit authorship.
        if let Some(contributor) = graph
            .contributors
            .iter_mut()
            .find(|c| c.github_id.is_none() && c.login == login)
        {
            contributor.github_id = Some(github_id);
            return Ok(contributor.clone());
        }

        let contributor = Contributor {
            local_id: Uuid::new_v4(),
            github_id: Some(github_id),
            login: login.to_string(),
        };
        graph.contributors.push(contributor.clone());
        Ok(contributor)
    }

    async fn upsert_contributor_by_login(&self, login: &str) -> Result<Contributor, StoreError> {
        let mut graph = self.graph.write().await;

        // Prefer a row that already carries the provider identity.
        if let Some(contributor) = graph
            .contributors
            .iter()
            .filter(|c| c.login == login)
            .max_by_key(|c| c.github_id.is_some())
        {
            return Ok(contributor.clone());
        }

        let contributor = Contributor {
            local_id: Uuid::new_v4(),
            github_id: None,
            login: login.to_string(),
        };
        graph.contributors.push(contributor.clone());
        Ok(contributor)
    }

    async fn find_contributor_by_login(
        &self,
        login: &str,
    ) -> Result<Option<Contributor>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph
            .contributors
            .iter()
            .filter(|c| c.login == login)
            .max_by_key(|c| c.github_id.is_some())
            .cloned())
    }

    async fn upsert_pull_request(
        &self,
        upsert: PullRequestUpsert,
    ) -> Result<PullRequest, StoreError> {
        let mut graph = self.graph.write().await;

        if let Some(pr) = graph
            .pull_requests
            .iter_mut()
            .find(|pr| pr.repository_id == upsert.repository_id && pr.number == upsert.number)
        {
            pr.author_id = upsert.author_id;
            pr.title = upsert.title;
            pr.url = upsert.url;
            pr.state = upsert.state;
            pr.additions = upsert.additions;
            pr.deletions = upsert.deletions;
            pr.changed_files = upsert.changed_files;
            pr.merged_at = upsert.merged_at;
            return Ok(pr.clone());
        }

        let pr = PullRequest {
            local_id: Uuid::new_v4(),
            github_id: upsert.github_id,
            repository_id: upsert.repository_id,
            author_id: upsert.author_id,
            number: upsert.number,
            title: upsert.title,
            url: upsert.url,
            state: upsert.state,
            additions: upsert.additions,
            deletions: upsert.deletions,
            changed_files: upsert.changed_files,
            created_at: upsert.created_at,
            merged_at: upsert.merged_at,
            first_review_at: None,
            approved_at: None,
        };
        graph.pull_requests.push(pr.clone());
        Ok(pr)
    }

    async fn find_pull_request(
        &self,
        repository_id: Uuid,
        number: u64,
    ) -> Result<Option<PullRequest>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph
            .pull_requests
            .iter()
            .find(|pr| pr.repository_id == repository_id && pr.number == number)
            .cloned())
    }

    async fn upsert_review(&self, upsert: ReviewUpsert) -> Result<PrReview, StoreError> {
        let mut graph = self.graph.write().await;
        let review = graph
            .reviews
            .entry(upsert.github_id)
            .and_modify(|review| {
                review.state = upsert.state.clone();
                review.submitted_at = upsert.submitted_at;
            })
            .or_insert_with(|| PrReview {
                local_id: Uuid::new_v4(),
                github_id: upsert.github_id,
                pull_request_id: upsert.pull_request_id,
                reviewer_id: upsert.reviewer_id,
                state: upsert.state.clone(),
                submitted_at: upsert.submitted_at,
            });
        Ok(review.clone())
    }

    async fn set_pr_timestamp_if_absent(
        &self,
        pull_request_id: Uuid,
        field: PrTimestampField,
        value: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut graph = self.graph.write().await;
        let Some(pr) = graph
            .pull_requests
            .iter_mut()
            .find(|pr| pr.local_id == pull_request_id)
        else {
            return Ok(false);
        };

        let slot = match field {
            PrTimestampField::FirstReview => &mut pr.first_review_at,
            PrTimestampField::Approved => &mut pr.approved_at,
        };
        if slot.is_some() {
            return Ok(false);
        }
        *slot = Some(value);
        Ok(true)
    }

    async fn upsert_commit(&self, upsert: CommitUpsert) -> Result<Commit, StoreError> {
        let mut graph = self.graph.write().await;
        let commit = graph
            .commits
            .entry(upsert.sha.clone())
            .and_modify(|commit| {
                commit.repository_id = upsert.repository_id;
                commit.author_id = upsert.author_id;
                commit.message = upsert.message.clone();
                commit.committed_at = upsert.committed_at;
            })
            .or_insert_with(|| Commit {
                sha: upsert.sha.clone(),
                repository_id: upsert.repository_id,
                author_id: upsert.author_id,
                message: upsert.message.clone(),
                committed_at: upsert.committed_at,
            });
        Ok(commit.clone())
    }

    async fn find_commit(&self, sha: &str) -> Result<Option<Commit>, StoreError> {
        let graph = self.graph.read().await;
        Ok(graph.commits.get(sha).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PullRequestState;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn pr_upsert(repository_id: Uuid, author_id: Uuid, number: u64) -> PullRequestUpsert {
        PullRequestUpsert {
            github_id: 9000 + number,
            repository_id,
            author_id,
            number,
            title: "Add widget".to_string(),
            url: format!("https://github.com/acme/widgets/pull/{}", number),
            state: PullRequestState::Open,
            additions: 10,
            deletions: 2,
            changed_files: 3,
            created_at: ts(1_700_000_000),
            merged_at: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_organization_is_idempotent() {
        let store = MemoryStore::new();

        let first = store.upsert_organization(1001, "acme-org").await.unwrap();
        let second = store.upsert_organization(1001, "acme-org").await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_upsert_organization_preserves_activity_flag() {
        let store = MemoryStore::new();

        store.upsert_organization(1001, "acme-org").await.unwrap();
        store.deactivate_organization(1001).await.unwrap();
        let after = store.upsert_organization(1001, "acme-org").await.unwrap();

        assert!(!after.is_active, "upsert must not reactivate");
    }

    #[tokio::test]
    async fn test_full_identity_upsert_claims_login_only_row() {
        let store = MemoryStore::new();

        let by_login = store.upsert_contributor_by_login("octocat").await.unwrap();
        assert_eq!(by_login.github_id, None);

        let by_identity = store.upsert_contributor(555, "octocat").await.unwrap();
        assert_eq!(by_identity.local_id, by_login.local_id);
        assert_eq!(by_identity.github_id, Some(555));

        assert_eq!(store.contributor_count().await, 1);
    }

    #[tokio::test]
    async fn test_login_only_upsert_reuses_identified_row() {
        let store = MemoryStore::new();

        let identified = store.upsert_contributor(555, "octocat").await.unwrap();
        let by_login = store.upsert_contributor_by_login("octocat").await.unwrap();

        assert_eq!(by_login.local_id, identified.local_id);
        assert_eq!(by_login.github_id, Some(555));
        assert_eq!(store.contributor_count().await, 1);
    }

    #[tokio::test]
    async fn test_pull_request_upsert_replaces_mutable_fields_only() {
        let store = MemoryStore::new();
        let repo_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();

        let pr = store
            .upsert_pull_request(pr_upsert(repo_id, author_id, 7))
            .await
            .unwrap();
        store
            .set_pr_timestamp_if_absent(pr.local_id, PrTimestampField::FirstReview, ts(100))
            .await
            .unwrap();

        let mut second = pr_upsert(repo_id, author_id, 7);
        second.state = PullRequestState::Merged;
        second.merged_at = Some(ts(200));
        let updated = store.upsert_pull_request(second).await.unwrap();

        assert_eq!(updated.local_id, pr.local_id);
        assert_eq!(updated.state, PullRequestState::Merged);
        assert_eq!(updated.merged_at, Some(ts(200)));
        assert_eq!(
            updated.first_review_at,
            Some(ts(100)),
            "replace must not clear the set-once field"
        );
        assert_eq!(store.pull_request_count().await, 1);
    }

    #[tokio::test]
    async fn test_set_if_absent_only_first_write_wins() {
        let store = MemoryStore::new();
        let pr = store
            .upsert_pull_request(pr_upsert(Uuid::new_v4(), Uuid::new_v4(), 1))
            .await
            .unwrap();

        let first = store
            .set_pr_timestamp_if_absent(pr.local_id, PrTimestampField::Approved, ts(500))
            .await
            .unwrap();
        let second = store
            .set_pr_timestamp_if_absent(pr.local_id, PrTimestampField::Approved, ts(400))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);

        let stored = store
            .find_pull_request(pr.repository_id, pr.number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.approved_at, Some(ts(500)));
    }

    #[tokio::test]
    async fn test_delete_repository() {
        let store = MemoryStore::new();
        let org = store.upsert_organization(1001, "acme-org").await.unwrap();
        store
            .upsert_repository(2001, org.local_id, "backend")
            .await
            .unwrap();

        assert!(store.delete_repository(2001).await.unwrap());
        assert!(!store.delete_repository(2001).await.unwrap());
        assert!(store.find_repository(2001).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_upsert_converges() {
        let store = MemoryStore::new();
        let repo_id = Uuid::new_v4();

        let upsert = CommitUpsert {
            sha: "abc123".to_string(),
            repository_id: repo_id,
            author_id: None,
            message: "fix build".to_string(),
            committed_at: ts(300),
        };
        store.upsert_commit(upsert.clone()).await.unwrap();
        let second = store.upsert_commit(upsert).await.unwrap();

        assert_eq!(second.sha, "abc123");
        assert_eq!(second.author_id, None);
        let found = store.find_commit("abc123").await.unwrap();
        assert_eq!(found, Some(second));
    }
}
