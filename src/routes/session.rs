use axum::{
    Json, Router,
    extract::State,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::session::{EntitlementRequest, SessionResponse, SignInRequest, SignInResponse},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes managing who owns the recorded matches.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(current_session))
        .route("/session/sign-in", post(sign_in))
        .route("/session/sign-out", post(sign_out))
        .route("/session/entitlement", put(set_entitlement))
}

#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn current_session(State(state): State<SharedState>) -> Json<SessionResponse> {
    Json(session_service::current_session(&state).await)
}

/// Switch to an authenticated account, optionally migrating guest matches.
#[utoipa::path(
    post,
    path = "/session/sign-in",
    tag = "session",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 503, description = "Guest data could not be migrated")
    )
)]
pub async fn sign_in(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SignInRequest>>,
) -> Result<Json<SignInResponse>, AppError> {
    Ok(Json(session_service::sign_in(&state, payload).await?))
}

#[utoipa::path(
    post,
    path = "/session/sign-out",
    tag = "session",
    responses((status = 200, description = "Back to guest mode", body = SessionResponse))
)]
pub async fn sign_out(State(state): State<SharedState>) -> Json<SessionResponse> {
    Json(session_service::sign_out(&state).await)
}

/// Record the entitlement reported by the payment provider.
#[utoipa::path(
    put,
    path = "/session/entitlement",
    tag = "session",
    request_body = EntitlementRequest,
    responses((status = 200, description = "Entitlement updated", body = SessionResponse))
)]
pub async fn set_entitlement(
    State(state): State<SharedState>,
    Json(payload): Json<EntitlementRequest>,
) -> Json<SessionResponse> {
    Json(session_service::set_entitlement(&state, payload).await)
}
