use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::history::{HistoryResponse, StatsResponse},
    error::AppError,
    services::history_service,
    state::SharedState,
};

/// Routes exposing stored matches.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/history", get(list_history))
        .route("/history/{id}", delete(delete_match))
        .route("/stats", get(stats))
}

/// List stored matches, newest first.
#[utoipa::path(
    get,
    path = "/history",
    tag = "history",
    responses(
        (status = 200, description = "Match history", body = HistoryResponse),
        (status = 503, description = "Storage unreachable")
    )
)]
pub async fn list_history(
    State(state): State<SharedState>,
) -> Result<Json<HistoryResponse>, AppError> {
    Ok(Json(history_service::list_history(&state).await?))
}

#[utoipa::path(
    delete,
    path = "/history/{id}",
    tag = "history",
    params(("id" = String, Path, description = "Identifier of the match to delete")),
    responses((status = 204, description = "Match deleted"))
)]
pub async fn delete_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    history_service::delete_match(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Aggregate statistics, pro tier only.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "history",
    responses(
        (status = 200, description = "Statistics", body = StatsResponse),
        (status = 403, description = "Pro tier required")
    )
)]
pub async fn stats(State(state): State<SharedState>) -> Result<Json<StatsResponse>, AppError> {
    Ok(Json(history_service::stats(&state).await?))
}
