//! Error types shared by the remote storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`RemoteDaoError`] failures.
pub type RemoteResult<T> = Result<T, RemoteDaoError>;

/// Failures that can occur while talking to the remote database.
#[derive(Debug, Error)]
pub enum RemoteDaoError {
    /// Required environment variable is missing.
    #[error("missing remote storage environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build remote storage client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send remote storage request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The remote database answered with an unexpected status code.
    #[error("unexpected remote storage response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// Response payload could not be decoded into match records.
    #[error("failed to decode remote storage response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// An insert returned fewer rows than were sent.
    #[error("remote insert into `{path}` returned {returned} of {sent} rows")]
    ShortInsert {
        path: String,
        sent: usize,
        returned: usize,
    },
}
