//! Reconciliation for `push` events.

use tracing::info;

use super::payload::PushPayload;
use super::{IngestError, IngestOutcome};
use crate::store::{CommitUpsert, EntityStore};

pub(super) async fn handle(
    store: &dyn EntityStore,
    payload: PushPayload,
) -> Result<IngestOutcome, IngestError> {
    // Branch deletions and tag pushes deliver an empty commit list; skip
    // them without touching the store.
    if payload.commits.is_empty() {
        return Ok(IngestOutcome::Ignored("push with no commits"));
    }

    let repo_info = &payload.repository;
    let org = store
        .upsert_organization(repo_info.owner.id, &repo_info.owner.login)
        .await?;
    let repo = store
        .upsert_repository(repo_info.id, org.local_id, &repo_info.name)
        .await?;

    for commit in &payload.commits {
        // Commit authorship is a git identity; only attribute the commit
        // when the sender resolved it to a username.
        let author_id = match &commit.author.username {
            Some(username) => Some(
                store
                    .upsert_contributor_by_login(username)
                    .await?
                    .local_id,
            ),
            None => None,
        };

        store
            .upsert_commit(CommitUpsert {
                sha: commit.id.clone(),
                repository_id: repo.local_id,
                author_id,
                message: commit.message.clone(),
                committed_at: commit.timestamp,
            })
            .await?;
    }

    info!(
        repo = %repo.name,
        commits = payload.commits.len(),
        "push reconciled"
    );
    Ok(IngestOutcome::Processed)
}
