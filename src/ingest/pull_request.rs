//! Reconciliation for `pull_request` events.

use tracing::info;

use super::payload::PullRequestPayload;
use super::{IngestError, IngestOutcome};
use crate::model::PullRequestState;
use crate::store::{EntityStore, PullRequestUpsert};

/// Every pull request action replays the same cascade: the payload carries a
/// full snapshot of the PR, so reconciling on `opened`, `edited`, `closed`,
/// `reopened`, or `synchronize` is the same upsert with fresher fields.
pub(super) async fn handle(
    store: &dyn EntityStore,
    payload: PullRequestPayload,
) -> Result<IngestOutcome, IngestError> {
    let repo_info = &payload.repository;
    let pr_info = &payload.pull_request;

    let org = store
        .upsert_organization(repo_info.owner.id, &repo_info.owner.login)
        .await?;
    let repo = store
        .upsert_repository(repo_info.id, org.local_id, &repo_info.name)
        .await?;
    let author = store
        .upsert_contributor(pr_info.user.id, &pr_info.user.login)
        .await?;

    // The provider reports a merged PR as closed; fold the merged flag into
    // a three-way state so merged and abandoned PRs stay distinguishable.
    let state = if pr_info.merged || pr_info.merged_at.is_some() {
        PullRequestState::Merged
    } else if pr_info.state == "closed" {
        PullRequestState::Closed
    } else {
        PullRequestState::Open
    };

    let stored = store
        .upsert_pull_request(PullRequestUpsert {
            github_id: pr_info.id,
            repository_id: repo.local_id,
            author_id: author.local_id,
            number: pr_info.number,
            title: pr_info.title.clone(),
            url: pr_info.html_url.clone(),
            state,
            additions: pr_info.additions,
            deletions: pr_info.deletions,
            changed_files: pr_info.changed_files,
            created_at: pr_info.created_at,
            merged_at: pr_info.merged_at,
        })
        .await?;

    info!(
        repo = %repo.name,
        number = stored.number,
        action = %payload.action,
        state = stored.state.as_str(),
        "pull request reconciled"
    );
    Ok(IngestOutcome::Processed)
}
