use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Ping the storage serving the current identity and report its status.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let identity = state.identity().await;
    let storage = if identity.is_remote() { "remote" } else { "local" };
    let companions = state.companions().len();

    match state.repository().health_check(&identity).await {
        Ok(()) => HealthResponse::ok(storage, companions),
        Err(err) => {
            warn!(%identity, error = %err, "storage health check failed");
            HealthResponse::degraded(storage, companions)
        }
    }
}
