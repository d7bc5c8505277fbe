//! Error types shared by the device-local storage implementation.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias returning [`LocalDaoError`] failures.
pub type LocalResult<T> = Result<T, LocalDaoError>;

/// Failures that can occur while reading or writing device storage.
#[derive(Debug, Error)]
pub enum LocalDaoError {
    /// Reading a storage slot failed.
    #[error("failed to read device storage slot `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing a storage slot failed.
    #[error("failed to write device storage slot `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Records could not be encoded before being written back.
    #[error("failed to encode records for slot `{key}`")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
