//! In-memory stand-ins for the remote database used by unit tests.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    dao::{
        match_store::{MatchStore, RemoteBackend},
        models::{MatchEntity, MatchId, MatchPatch, NewMatchEntity},
        storage::{StorageError, StorageResult},
    },
    state::identity::UserId,
};

#[derive(Default)]
struct FakeInner {
    rows: Mutex<Vec<(UserId, MatchEntity)>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    updates: AtomicUsize,
}

/// Remote backend keeping rows in memory, with switchable failures.
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<FakeInner>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `update_match` calls.
    pub fn update_count(&self) -> usize {
        self.inner.updates.load(Ordering::SeqCst)
    }

    pub fn rows_for(&self, user: &UserId) -> Vec<MatchEntity> {
        let rows = self.inner.rows.lock().unwrap();
        rows.iter()
            .filter(|(owner, _)| owner == user)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.inner.rows.lock().unwrap().len()
    }
}

impl RemoteBackend for FakeRemote {
    fn scoped(&self, user: &UserId) -> Arc<dyn MatchStore> {
        Arc::new(FakeScopedStore {
            inner: self.inner.clone(),
            user: user.clone(),
        })
    }
}

#[derive(Clone)]
struct FakeScopedStore {
    inner: Arc<FakeInner>,
    user: UserId,
}

fn injected() -> StorageError {
    StorageError::unavailable(
        "injected failure".into(),
        std::io::Error::other("remote unreachable"),
    )
}

impl FakeScopedStore {
    fn check_write(&self) -> StorageResult<()> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    fn check_read(&self) -> StorageResult<()> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(())
    }

    fn insert(&self, new: Vec<NewMatchEntity>) -> StorageResult<Vec<MatchEntity>> {
        self.check_write()?;
        let created_at = OffsetDateTime::now_utc();
        let created = new
            .into_iter()
            .map(|payload| {
                MatchEntity::from_new(MatchId::new(Uuid::new_v4().to_string()), created_at, payload)
            })
            .collect::<Vec<_>>();
        let mut rows = self.inner.rows.lock().unwrap();
        for row in &created {
            rows.push((self.user.clone(), row.clone()));
        }
        Ok(created)
    }

    fn list(&self, active_only: bool) -> StorageResult<Vec<MatchEntity>> {
        self.check_read()?;
        let rows = self.inner.rows.lock().unwrap();
        let mut listed = rows
            .iter()
            .filter(|(owner, row)| owner == &self.user && (!active_only || row.is_active))
            .map(|(_, row)| row.clone())
            .collect::<Vec<_>>();
        listed.reverse();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }
}

impl MatchStore for FakeScopedStore {
    fn insert_match(&self, new: NewMatchEntity) -> BoxFuture<'static, StorageResult<MatchEntity>> {
        let result = self
            .insert(vec![new])
            .and_then(|mut created| created.pop().ok_or_else(injected));
        Box::pin(async move { result })
    }

    fn insert_matches(
        &self,
        new: Vec<NewMatchEntity>,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let result = self.insert(new);
        Box::pin(async move { result })
    }

    fn list_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let result = self.list(false);
        Box::pin(async move { result })
    }

    fn list_active_matches(&self) -> BoxFuture<'static, StorageResult<Vec<MatchEntity>>> {
        let result = self.list(true);
        Box::pin(async move { result })
    }

    fn update_match(&self, id: MatchId, patch: MatchPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_write()?;
            let mut rows = store.inner.rows.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|(owner, row)| owner == &store.user && row.id == id)
                .map(|(_, row)| row)
                .ok_or(StorageError::NotFound(id))?;
            row.apply(patch);
            store.inner.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn delete_match(&self, id: MatchId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.check_write()?;
            let mut rows = store.inner.rows.lock().unwrap();
            rows.retain(|(owner, row)| !(owner == &store.user && row.id == id));
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.check_read();
        Box::pin(async move { result })
    }
}
