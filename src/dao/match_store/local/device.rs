use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;

use super::error::{LocalDaoError, LocalResult};

/// String-keyed slots persisted on the device, the equivalent of a mobile
/// key-value store.
pub trait DeviceStorage: Send + Sync {
    fn get_item(&self, key: &str) -> BoxFuture<'static, LocalResult<Option<String>>>;
    fn set_item(&self, key: &str, value: String) -> BoxFuture<'static, LocalResult<()>>;
    fn remove_item(&self, key: &str) -> BoxFuture<'static, LocalResult<()>>;
}

/// Device storage keeping one `<key>.json` file per slot inside a directory.
#[derive(Clone)]
pub struct FileDeviceStorage {
    dir: Arc<PathBuf>,
}

impl FileDeviceStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Arc::new(dir.into()),
        }
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl DeviceStorage for FileDeviceStorage {
    fn get_item(&self, key: &str) -> BoxFuture<'static, LocalResult<Option<String>>> {
        let path = self.slot_path(key);
        Box::pin(async move {
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(source) => Err(LocalDaoError::Read { path, source }),
            }
        })
    }

    fn set_item(&self, key: &str, value: String) -> BoxFuture<'static, LocalResult<()>> {
        let dir = self.dir.clone();
        let path = self.slot_path(key);
        Box::pin(async move {
            tokio::fs::create_dir_all(dir.as_path())
                .await
                .map_err(|source| LocalDaoError::Write {
                    path: dir.to_path_buf(),
                    source,
                })?;

            // Write then rename so a crash never leaves a truncated slot.
            let staging = path.with_extension("json.tmp");
            tokio::fs::write(&staging, value)
                .await
                .map_err(|source| LocalDaoError::Write {
                    path: staging.clone(),
                    source,
                })?;
            tokio::fs::rename(&staging, &path)
                .await
                .map_err(|source| LocalDaoError::Write { path, source })
        })
    }

    fn remove_item(&self, key: &str) -> BoxFuture<'static, LocalResult<()>> {
        let path = self.slot_path(key);
        Box::pin(async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(LocalDaoError::Write { path, source }),
            }
        })
    }
}

/// Volatile device storage, used when no data directory is wanted and in tests.
#[derive(Clone, Default)]
pub struct MemoryDeviceStorage {
    slots: Arc<DashMap<String, String>>,
}

impl MemoryDeviceStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceStorage for MemoryDeviceStorage {
    fn get_item(&self, key: &str) -> BoxFuture<'static, LocalResult<Option<String>>> {
        let value = self.slots.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn set_item(&self, key: &str, value: String) -> BoxFuture<'static, LocalResult<()>> {
        self.slots.insert(key.to_owned(), value);
        Box::pin(async { Ok(()) })
    }

    fn remove_item(&self, key: &str) -> BoxFuture<'static, LocalResult<()>> {
        self.slots.remove(key);
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn file_slots_round_trip_and_disappear() {
        let dir = std::env::temp_dir().join(format!("rally-score-{}", Uuid::new_v4().simple()));
        let storage = FileDeviceStorage::new(&dir);

        assert_eq!(storage.get_item("slot").await.unwrap(), None);
        storage.set_item("slot", "[1,2]".into()).await.unwrap();
        assert_eq!(storage.get_item("slot").await.unwrap().as_deref(), Some("[1,2]"));

        storage.remove_item("slot").await.unwrap();
        storage.remove_item("slot").await.unwrap();
        assert_eq!(storage.get_item("slot").await.unwrap(), None);

        let _ = std::fs::remove_dir_all(dir);
    }
}
