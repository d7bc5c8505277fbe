mod device;
mod error;
mod store;

pub use device::{DeviceStorage, FileDeviceStorage, MemoryDeviceStorage};
pub use error::{LocalDaoError, LocalResult};
pub use store::{GUEST_MATCHES_KEY, LocalMatchStore};

use crate::dao::storage::StorageError;

impl From<LocalDaoError> for StorageError {
    fn from(err: LocalDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
