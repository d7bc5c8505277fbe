use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dao::models::Side,
    dto::matches::{
        ActiveMatchesResponse, FinishMatchResponse, MatchStateResponse, MatchSummaryDto,
        StartMatchRequest,
    },
    error::AppError,
    services::match_service,
    state::SharedState,
};

/// Routes driving the live match.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/match", get(current_match))
        .route("/match/start", post(start_match))
        .route("/match/score/a", post(score_team_a))
        .route("/match/score/b", post(score_team_b))
        .route("/match/server/switch", post(switch_server))
        .route("/match/undo", post(undo))
        .route("/match/end", post(end_match))
        .route("/match/finish", post(finish_match))
        .route("/match/reset", post(reset_match))
        .route("/matches/active", get(active_matches))
        .route("/matches/{id}/deactivate", post(deactivate_match))
}

/// Return the live match.
#[utoipa::path(
    get,
    path = "/match",
    tag = "match",
    responses((status = 200, description = "Live match", body = MatchStateResponse))
)]
pub async fn current_match(State(state): State<SharedState>) -> Json<MatchStateResponse> {
    Json(match_service::current_match(&state).await)
}

/// Configure and start a new match for the current identity.
#[utoipa::path(
    post,
    path = "/match/start",
    tag = "match",
    request_body = StartMatchRequest,
    responses(
        (status = 200, description = "Match started", body = MatchStateResponse),
        (status = 400, description = "Invalid setup"),
        (status = 409, description = "A match is already in progress")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartMatchRequest>>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::start_match(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/match/score/a",
    tag = "match",
    responses(
        (status = 200, description = "Point awarded to team A", body = MatchStateResponse),
        (status = 409, description = "No match in progress or match already won")
    )
)]
pub async fn score_team_a(
    State(state): State<SharedState>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::score(&state, Side::TeamA).await?))
}

#[utoipa::path(
    post,
    path = "/match/score/b",
    tag = "match",
    responses(
        (status = 200, description = "Point awarded to team B", body = MatchStateResponse),
        (status = 409, description = "No match in progress or match already won")
    )
)]
pub async fn score_team_b(
    State(state): State<SharedState>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::score(&state, Side::TeamB).await?))
}

#[utoipa::path(
    post,
    path = "/match/server/switch",
    tag = "match",
    responses((status = 200, description = "Server switched", body = MatchStateResponse))
)]
pub async fn switch_server(
    State(state): State<SharedState>,
) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::switch_server(&state).await?))
}

/// Revert the most recent action.
#[utoipa::path(
    post,
    path = "/match/undo",
    tag = "match",
    responses((status = 200, description = "Last action reverted", body = MatchStateResponse))
)]
pub async fn undo(State(state): State<SharedState>) -> Result<Json<MatchStateResponse>, AppError> {
    Ok(Json(match_service::undo(&state).await?))
}

/// End the match and write its final statistics.
#[utoipa::path(
    post,
    path = "/match/end",
    tag = "match",
    responses((status = 200, description = "Match ended", body = MatchSummaryDto))
)]
pub async fn end_match(
    State(state): State<SharedState>,
) -> Result<Json<MatchSummaryDto>, AppError> {
    Ok(Json(match_service::end_match(&state).await?))
}

/// End the match and save it to history.
#[utoipa::path(
    post,
    path = "/match/finish",
    tag = "match",
    responses(
        (status = 200, description = "Match ended and saved", body = FinishMatchResponse),
        (status = 503, description = "Match ended but could not be saved")
    )
)]
pub async fn finish_match(
    State(state): State<SharedState>,
) -> Result<Json<FinishMatchResponse>, AppError> {
    Ok(Json(match_service::finish_match(&state).await?))
}

/// Zero the score locally without touching storage.
#[utoipa::path(
    post,
    path = "/match/reset",
    tag = "match",
    responses((status = 200, description = "Score reset", body = MatchStateResponse))
)]
pub async fn reset_match(State(state): State<SharedState>) -> Json<MatchStateResponse> {
    Json(match_service::reset_match(&state).await)
}

#[utoipa::path(
    get,
    path = "/matches/active",
    tag = "match",
    responses((status = 200, description = "Matches still in progress", body = ActiveMatchesResponse))
)]
pub async fn active_matches(State(state): State<SharedState>) -> Json<ActiveMatchesResponse> {
    Json(match_service::active_matches(&state).await)
}

/// Close an abandoned in-progress match.
#[utoipa::path(
    post,
    path = "/matches/{id}/deactivate",
    tag = "match",
    params(("id" = String, Path, description = "Identifier of the match to close")),
    responses(
        (status = 204, description = "Match closed"),
        (status = 409, description = "Match could not be closed")
    )
)]
pub async fn deactivate_match(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    match_service::deactivate_match(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
