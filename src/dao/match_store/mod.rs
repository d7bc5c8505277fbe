pub mod local;
#[cfg(feature = "remote-store")]
pub mod remote;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    dao::{
        models::{MatchEntity, MatchId, MatchPatch, NewMatchEntity},
        storage::StorageResult,
    },
    state::identity::UserId,
};

/// Abstraction over one persistence backend for match records.
///
/// Listing operations return records newest first.
pub trait MatchStore: Send + Sync {
    fn insert_match(&self, new: NewMatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>>;
    fn insert_matches(
        &self,
        new: Vec<NewMatchEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn list_active_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>>;
    fn update_match(&self, id: MatchId, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>>;
    fn delete_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Remote database reachable by authenticated users.
///
/// Ownership is enforced by the backend, so each handle is bound to one user.
pub trait RemoteBackend: Send + Sync {
    fn scoped(&self, user: &UserId) -> Arc<dyn MatchStore>;
}
