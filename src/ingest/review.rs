//! Reconciliation for `pull_request_review` events.

use tracing::{info, warn};

use super::payload::ReviewPayload;
use super::{IngestError, IngestOutcome};
use crate::store::{EntityStore, PrTimestampField, ReviewUpsert};

pub(super) async fn handle(
    store: &dyn EntityStore,
    payload: ReviewPayload,
) -> Result<IngestOutcome, IngestError> {
    if payload.action != "submitted" {
        info!(action = %payload.action, "ignoring review action");
        return Ok(IngestOutcome::Ignored("unhandled review action"));
    }

    let Some(submitted_at) = payload.review.submitted_at else {
        warn!(review = payload.review.id, "review submitted without timestamp");
        return Ok(IngestOutcome::Ignored("review without submission timestamp"));
    };

    let repo_info = &payload.repository;
    let org = store
        .upsert_organization(repo_info.owner.id, &repo_info.owner.login)
        .await?;
    let repo = store
        .upsert_repository(repo_info.id, org.local_id, &repo_info.name)
        .await?;
    let reviewer = store
        .upsert_contributor(payload.review.user.id, &payload.review.user.login)
        .await?;

    // Reviews reference the PR by number; if the PR event never arrived
    // (out-of-order delivery, or a subscription added mid-flight), drop the
    // review rather than invent a placeholder PR from a payload that lacks
    // the fields to build one.
    let Some(pr) = store
        .find_pull_request(repo.local_id, payload.pull_request.number)
        .await?
    else {
        warn!(
            repo = %repo.name,
            number = payload.pull_request.number,
            "dropping review for unknown pull request"
        );
        return Ok(IngestOutcome::Ignored("review for unknown pull request"));
    };

    store
        .upsert_review(ReviewUpsert {
            github_id: payload.review.id,
            pull_request_id: pr.local_id,
            reviewer_id: reviewer.local_id,
            state: payload.review.state.clone(),
            submitted_at,
        })
        .await?;

    // Set-once milestones. Out-of-order deliveries keep the timestamp of
    // whichever review was observed first; the store makes the transition
    // atomic so concurrent deliveries cannot both win.
    store
        .set_pr_timestamp_if_absent(pr.local_id, PrTimestampField::FirstReview, submitted_at)
        .await?;
    if payload.review.state == "approved" {
        store
            .set_pr_timestamp_if_absent(pr.local_id, PrTimestampField::Approved, submitted_at)
            .await?;
    }

    info!(
        repo = %repo.name,
        number = pr.number,
        state = %payload.review.state,
        "review reconciled"
    );
    Ok(IngestOutcome::Processed)
}
