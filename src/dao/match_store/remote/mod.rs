mod config;
mod error;
mod models;
mod store;

pub use config::RemoteConfig;
pub use error::{RemoteDaoError, RemoteResult};
pub use store::{RemoteMatchBackend, RemoteMatchStore};

use crate::dao::storage::StorageError;

impl From<RemoteDaoError> for StorageError {
    fn from(err: RemoteDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
