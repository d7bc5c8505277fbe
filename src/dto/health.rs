use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// `local` or `remote`, following the current identity.
    pub storage: String,
    /// Companion devices currently connected.
    pub companions: usize,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(storage: &str, companions: usize) -> Self {
        Self {
            status: "ok".to_string(),
            storage: storage.to_string(),
            companions,
        }
    }

    /// Create a health response indicating the storage of the current identity is unreachable.
    pub fn degraded(storage: &str, companions: usize) -> Self {
        Self {
            status: "degraded".to_string(),
            storage: storage.to_string(),
            companions,
        }
    }
}
