//! Persistence adapter routing every match operation to device storage or
//! the remote database depending on who owns the data.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dao::{
        match_store::{MatchStore, RemoteBackend},
        models::{MatchEntity, MatchId, MatchPatch, NewMatchEntity},
        storage::{StorageError, StorageResult},
    },
    state::identity::Identity,
};

/// Uniform entry point over the local and remote match stores.
#[derive(Clone)]
pub struct MatchRepository {
    local: Arc<dyn MatchStore>,
    remote: Option<Arc<dyn RemoteBackend>>,
}

impl MatchRepository {
    pub fn new(local: Arc<dyn MatchStore>, remote: Option<Arc<dyn RemoteBackend>>) -> Self {
        Self { local, remote }
    }

    /// Whether authenticated identities can be served.
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Resolve the backend owning `identity`'s records.
    pub fn store_for(&self, identity: &Identity) -> StorageResult<Arc<dyn MatchStore>> {
        match identity {
            Identity::Local(_) => Ok(self.local.clone()),
            Identity::Remote(user) => self
                .remote
                .as_ref()
                .map(|remote| remote.scoped(user))
                .ok_or(StorageError::RemoteUnavailable),
        }
    }

    /// Insert a new record owned by `identity`.
    pub async fn save_match(
        &self,
        identity: &Identity,
        new: NewMatchEntity,
    ) -> StorageResult<MatchEntity> {
        let store = self.store_for(identity)?;
        let created = store
            .insert_match(new)
            .await
            .inspect_err(|err| warn!(%identity, error = %err, "failed to save match"))?;
        debug!(%identity, match_id = %created.id, "match saved");
        Ok(created)
    }

    /// Insert several records in one call.
    pub async fn save_matches(
        &self,
        identity: &Identity,
        new: Vec<NewMatchEntity>,
    ) -> StorageResult<Vec<MatchEntity>> {
        let store = self.store_for(identity)?;
        store
            .insert_matches(new)
            .await
            .inspect_err(|err| warn!(%identity, error = %err, "failed to save matches"))
    }

    /// Every record owned by `identity`, newest first.
    pub async fn get_matches(&self, identity: &Identity) -> StorageResult<Vec<MatchEntity>> {
        let store = self.store_for(identity)?;
        store
            .list_matches()
            .await
            .inspect_err(|err| warn!(%identity, error = %err, "failed to fetch matches"))
    }

    /// Records still in progress, newest first.
    pub async fn get_active_matches(&self, identity: &Identity) -> StorageResult<Vec<MatchEntity>> {
        let store = self.store_for(identity)?;
        store
            .list_active_matches()
            .await
            .inspect_err(|err| warn!(%identity, error = %err, "failed to fetch active matches"))
    }

    pub async fn update_match(
        &self,
        identity: &Identity,
        id: &MatchId,
        patch: MatchPatch,
    ) -> StorageResult<()> {
        let store = self.store_for(identity)?;
        store.update_match(id.clone(), patch).await.inspect_err(
            |err| warn!(%identity, match_id = %id, error = %err, "failed to update match"),
        )
    }

    pub async fn delete_match(&self, identity: &Identity, id: &MatchId) -> StorageResult<()> {
        let store = self.store_for(identity)?;
        store.delete_match(id.clone()).await.inspect_err(
            |err| warn!(%identity, match_id = %id, error = %err, "failed to delete match"),
        )
    }

    pub async fn health_check(&self, identity: &Identity) -> StorageResult<()> {
        self.store_for(identity)?.health_check().await
    }
}
