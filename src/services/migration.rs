//! One-shot transfer of the device's guest matches into a new account.

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    dao::{
        models::{MatchId, NewMatchEntity},
        repository::MatchRepository,
        storage::StorageError,
    },
    state::identity::{GuestId, Identity, UserId},
};

/// Outcome of a completed migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationReport {
    /// Matches now stored under the account.
    pub count: usize,
    /// Local copies that could not be removed after the upload.
    pub leftover: usize,
}

/// Migration stopped before any data was removed from the device.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read guest matches: {0}")]
    ReadLocal(#[source] StorageError),
    #[error("failed to upload guest matches: {0}")]
    Upload(#[source] StorageError),
}

/// Copy every guest match into `user`'s remote rows, then clear the device.
///
/// Migrated records are always inactive so they never compete with a match
/// started on the account. Local data is only deleted after the bulk insert
/// succeeded; a failed delete leaves a duplicate behind, never a loss.
///
/// `live` names the record of the match still being played; it stays on the
/// device for the engine to move on its own.
pub async fn migrate_guest_data(
    repository: &MatchRepository,
    user: &UserId,
    live: Option<&MatchId>,
) -> Result<MigrationReport, MigrationError> {
    let guest = Identity::Local(GuestId::anonymous());
    let account = Identity::Remote(user.clone());

    let mut local = repository
        .get_matches(&guest)
        .await
        .map_err(MigrationError::ReadLocal)?;
    if let Some(live) = live {
        local.retain(|entity| &entity.id != live);
    }
    if local.is_empty() {
        return Ok(MigrationReport::default());
    }

    let payload = local
        .iter()
        .cloned()
        .map(|entity| NewMatchEntity {
            is_active: false,
            ..NewMatchEntity::from(entity)
        })
        .collect::<Vec<_>>();

    let uploaded = repository
        .save_matches(&account, payload)
        .await
        .map_err(MigrationError::Upload)?;

    let mut leftover = 0;
    for entity in &local {
        if let Err(err) = repository.delete_match(&guest, &entity.id).await {
            warn!(match_id = %entity.id, error = %err, "migrated match left on device");
            leftover += 1;
        }
    }

    info!(%user, count = uploaded.len(), leftover, "guest matches migrated");
    Ok(MigrationReport {
        count: uploaded.len(),
        leftover,
    })
}
