use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Rally Score Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::matches::current_match,
        crate::routes::matches::start_match,
        crate::routes::matches::score_team_a,
        crate::routes::matches::score_team_b,
        crate::routes::matches::switch_server,
        crate::routes::matches::undo,
        crate::routes::matches::end_match,
        crate::routes::matches::finish_match,
        crate::routes::matches::reset_match,
        crate::routes::matches::active_matches,
        crate::routes::matches::deactivate_match,
        crate::routes::history::list_history,
        crate::routes::history::delete_match,
        crate::routes::history::stats,
        crate::routes::session::current_session,
        crate::routes::session::sign_in,
        crate::routes::session::sign_out,
        crate::routes::session::set_entitlement,
        crate::routes::sse::scoreboard_stream,
        crate::routes::websocket::companion_ws,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::matches::StartMatchRequest,
            crate::dto::matches::MatchStateResponse,
            crate::dto::matches::MatchPhaseDto,
            crate::dto::matches::MatchRecordDto,
            crate::dto::matches::MatchSummaryDto,
            crate::dto::matches::FinishMatchResponse,
            crate::dto::matches::ActiveMatchesResponse,
            crate::dto::history::HistoryResponse,
            crate::dto::history::StatsResponse,
            crate::dto::session::SessionResponse,
            crate::dto::session::SignInRequest,
            crate::dto::session::SignInResponse,
            crate::dto::session::EntitlementRequest,
            crate::dto::sse::ScoreboardEvent,
            crate::dto::ws::CompanionInboundMessage,
            crate::dto::ws::CompanionScoreMessage,
            crate::dao::models::MatchType,
            crate::dao::models::Side,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "match", description = "Live match scoring"),
        (name = "history", description = "Stored matches and statistics"),
        (name = "session", description = "Identity and entitlement"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "companion", description = "WebSocket channel for companion devices"),
    )
)]
pub struct ApiDoc;
