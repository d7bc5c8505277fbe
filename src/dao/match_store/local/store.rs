use std::sync::Arc;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::warn;

use crate::dao::{
    match_store::MatchStore,
    models::{MatchEntity, MatchId, MatchPatch, NewMatchEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    device::DeviceStorage,
    error::{LocalDaoError, LocalResult},
};

/// Slot holding the JSON array of every match recorded on the device.
pub const GUEST_MATCHES_KEY: &str = "rally_score_guest_matches";

/// Match store backed by a single JSON array in device storage.
///
/// Every operation rewrites the whole array while holding `gate`, so
/// concurrent calls never interleave their read-modify-write cycles.
#[derive(Clone)]
pub struct LocalMatchStore {
    storage: Arc<dyn DeviceStorage>,
    key: Arc<str>,
    gate: Arc<Mutex<()>>,
}

impl LocalMatchStore {
    pub fn new(storage: Arc<dyn DeviceStorage>) -> Self {
        Self::with_key(storage, GUEST_MATCHES_KEY)
    }

    pub fn with_key(storage: Arc<dyn DeviceStorage>, key: &str) -> Self {
        Self {
            storage,
            key: Arc::from(key),
            gate: Arc::new(Mutex::new(())),
        }
    }

    /// Load the stored array. Unreadable JSON is treated as an empty list.
    async fn read_all(&self) -> LocalResult<Vec<MatchEntity>> {
        let Some(json) = self.storage.get_item(&self.key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<MatchEntity>>(&json) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(key = %self.key, error = %err, "discarding malformed local matches");
                Ok(Vec::new())
            }
        }
    }

    async fn write_all(&self, records: &[MatchEntity]) -> LocalResult<()> {
        let json = serde_json::to_string(records).map_err(|source| LocalDaoError::Encode {
            key: self.key.to_string(),
            source,
        })?;
        self.storage.set_item(&self.key, json).await
    }

    async fn insert_many(&self, new: Vec<NewMatchEntity>) -> LocalResult<Vec<MatchEntity>> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_all().await?;

        let created_at = OffsetDateTime::now_utc();
        let created = new
            .into_iter()
            .map(|payload| MatchEntity::from_new(MatchId::generate_local(), created_at, payload))
            .collect::<Vec<_>>();

        records.splice(0..0, created.iter().cloned());
        self.write_all(&records).await?;
        Ok(created)
    }

    async fn list(&self, active_only: bool) -> LocalResult<Vec<MatchEntity>> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_all().await?;
        if active_only {
            records.retain(|record| record.is_active);
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn update(&self, id: MatchId, patch: MatchPatch) -> StorageResult<()> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_all().await?;

        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return Err(StorageError::NotFound(id));
        };
        record.apply(patch);

        self.write_all(&records).await?;
        Ok(())
    }

    async fn delete(&self, id: MatchId) -> LocalResult<()> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_all().await?;

        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Ok(());
        }

        self.write_all(&records).await
    }
}

impl MatchStore for LocalMatchStore {
    fn insert_match(&self, new: NewMatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut created = store.insert_many(vec![new]).await?;
            created
                .pop()
                .ok_or_else(|| StorageError::unavailable(
                    "local insert produced no record".into(),
                    std::io::Error::other("empty insert result"),
                ))
        })
    }

    fn insert_matches(
        &self,
        new: Vec<NewMatchEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.insert_many(new).await.map_err(Into::into) })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list(false).await.map_err(Into::into) })
    }

    fn list_active_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list(true).await.map_err(Into::into) })
    }

    fn update_match(&self, id: MatchId, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update(id, patch).await })
    }

    fn delete_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.storage.get_item(&store.key).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::{
        match_store::local::MemoryDeviceStorage,
        models::{MatchType, Side},
    };

    fn new_match(score_p1: u32, is_active: bool) -> NewMatchEntity {
        NewMatchEntity {
            score_p1,
            score_p2: 0,
            match_type: MatchType::Singles,
            scoring_rule: 11,
            team_a_name: None,
            team_b_name: None,
            duration_seconds: None,
            rally_count: score_p1,
            server: Side::TeamA,
            ended_at: None,
            is_active,
        }
    }

    fn store() -> (MemoryDeviceStorage, LocalMatchStore) {
        let device = MemoryDeviceStorage::new();
        let store = LocalMatchStore::new(Arc::new(device.clone()));
        (device, store)
    }

    #[tokio::test]
    async fn inserts_are_listed_newest_first() {
        let (_, store) = store();
        store.insert_match(new_match(1, false)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.insert_match(new_match(2, false)).await.unwrap();

        let listed = store.list_matches().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert!(listed.iter().all(|record| record.id.is_local()));
    }

    #[tokio::test]
    async fn active_listing_filters_and_update_patches() {
        let (_, store) = store();
        store.insert_match(new_match(1, false)).await.unwrap();
        let active = store.insert_match(new_match(2, true)).await.unwrap();

        let listed = store.list_active_matches().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active.id);

        store
            .update_match(active.id.clone(), MatchPatch::inactive())
            .await
            .unwrap();
        assert!(store.list_active_matches().await.unwrap().is_empty());
        assert_eq!(store.list_matches().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn updating_unknown_match_reports_not_found() {
        let (_, store) = store();
        let err = store
            .update_match(MatchId::new("local_0_missing"), MatchPatch::inactive())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let (_, store) = store();
        let first = store.insert_match(new_match(1, false)).await.unwrap();
        let second = store.insert_match(new_match(2, false)).await.unwrap();

        store.delete_match(first.id.clone()).await.unwrap();
        store.delete_match(first.id).await.unwrap();

        let listed = store.list_matches().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second.id);
    }

    #[tokio::test]
    async fn malformed_slot_reads_as_empty() {
        let (device, store) = store();
        device
            .set_item(GUEST_MATCHES_KEY, "{not json".into())
            .await
            .unwrap();

        assert!(store.list_matches().await.unwrap().is_empty());
        store.insert_match(new_match(1, true)).await.unwrap();
        assert_eq!(store.list_matches().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_keep_every_record() {
        let (_, store) = store();
        let tasks = (0..8)
            .map(|n| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_match(new_match(n, false)).await })
            })
            .collect::<Vec<_>>();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.list_matches().await.unwrap().len(), 8);
    }
}
