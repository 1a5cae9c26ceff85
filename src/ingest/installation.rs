//! Reconciliation for `installation` and `installation_repositories` events.

use tracing::info;

use super::payload::{InstallationPayload, InstallationRepositoriesPayload};
use super::{IngestError, IngestOutcome};
use crate::store::EntityStore;

pub(super) async fn handle_installation(
    store: &dyn EntityStore,
    payload: InstallationPayload,
) -> Result<IngestOutcome, IngestError> {
    let account = &payload.installation.account;
    match payload.action.as_str() {
        "created" => {
            let org = store.upsert_organization(account.id, &account.login).await?;
            for repo in &payload.repositories {
                store
                    .upsert_repository(repo.id, org.local_id, &repo.name)
                    .await?;
            }
            info!(
                org = %org.login,
                repositories = payload.repositories.len(),
                "installation created"
            );
            Ok(IngestOutcome::Processed)
        }
        "deleted" => {
            // Soft-deactivate only: repositories and history stay in place.
            store.deactivate_organization(account.id).await?;
            info!(org = %account.login, "installation deleted");
            Ok(IngestOutcome::Processed)
        }
        action => {
            info!(org = %account.login, action, "ignoring installation action");
            Ok(IngestOutcome::Ignored("unhandled installation action"))
        }
    }
}

pub(super) async fn handle_installation_repositories(
    store: &dyn EntityStore,
    payload: InstallationRepositoriesPayload,
) -> Result<IngestOutcome, IngestError> {
    let account = &payload.installation.account;
    let org = store.upsert_organization(account.id, &account.login).await?;

    for repo in &payload.repositories_added {
        store
            .upsert_repository(repo.id, org.local_id, &repo.name)
            .await?;
    }
    for repo in &payload.repositories_removed {
        store.delete_repository(repo.id).await?;
    }

    info!(
        org = %org.login,
        added = payload.repositories_added.len(),
        removed = payload.repositories_removed.len(),
        "installation repositories reconciled"
    );
    Ok(IngestOutcome::Processed)
}
