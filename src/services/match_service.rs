use tracing::{info, warn};

use crate::{
    dao::models::{MatchId, Side},
    dto::matches::{
        ActiveMatchesResponse, FinishMatchResponse, MatchRecordDto, MatchStateResponse,
        MatchSummaryDto, StartMatchRequest,
    },
    error::ServiceError,
    state::{SharedState, engine::MatchEngine},
};

/// Current view of the live match.
pub async fn current_match(state: &SharedState) -> MatchStateResponse {
    MatchStateResponse::from(&*state.engine().await)
}

/// Start a match for the current identity.
///
/// Free-tier identities are limited to one match in progress: an existing
/// one is returned as a conflict unless `replace_active` asks to close it.
pub async fn start_match(
    state: &SharedState,
    request: StartMatchRequest,
) -> Result<MatchStateResponse, ServiceError> {
    let session = state.session().await;
    let identity = session.identity();
    let registry = state.registry();

    let mut engine = state.engine().await;

    if !session.is_pro {
        let active = registry.fetch_active_matches(&identity).await;
        if let Some(first) = active.first() {
            if !request.replace_active {
                return Err(ServiceError::ActiveMatchExists(Box::new(first.clone())));
            }
            for entity in &active {
                registry.mark_match_inactive(&entity.id, &identity).await;
            }
            info!(%identity, replaced = active.len(), "closed previous active matches");
        } else if engine.is_match_active() && !request.replace_active {
            return Err(ServiceError::InvalidState(
                "a match is already in progress".into(),
            ));
        }
    }

    engine.start_match(request.to_setup(), identity).await;
    Ok(MatchStateResponse::from(&*engine))
}

/// Award a rally to `side`.
pub async fn score(state: &SharedState, side: Side) -> Result<MatchStateResponse, ServiceError> {
    let mut engine = state.engine().await;
    score_on(&mut engine, side)?;
    Ok(MatchStateResponse::from(&*engine))
}

/// Scoring rules shared by HTTP clients and companion devices.
fn score_on(engine: &mut MatchEngine, side: Side) -> Result<(), ServiceError> {
    require_active(engine)?;
    if engine.is_match_won() {
        return Err(ServiceError::InvalidState(
            "match is already won; end it to record the result".into(),
        ));
    }
    match side {
        Side::TeamA => engine.score_team_a(),
        Side::TeamB => engine.score_team_b(),
    }
    Ok(())
}

pub async fn switch_server(state: &SharedState) -> Result<MatchStateResponse, ServiceError> {
    let mut engine = state.engine().await;
    require_active(&engine)?;
    engine.switch_server();
    Ok(MatchStateResponse::from(&*engine))
}

/// Revert the last action; a no-op when nothing is left to undo.
pub async fn undo(state: &SharedState) -> Result<MatchStateResponse, ServiceError> {
    let mut engine = state.engine().await;
    require_active(&engine)?;
    engine.undo();
    Ok(MatchStateResponse::from(&*engine))
}

/// End the live match without adding a separate save step.
pub async fn end_match(state: &SharedState) -> Result<MatchSummaryDto, ServiceError> {
    let mut engine = state.engine().await;
    require_active(&engine)?;
    let summary = engine.end_match().await;
    Ok(MatchSummaryDto::from(&summary))
}

/// End the live match and persist it as a finished record.
pub async fn finish_match(state: &SharedState) -> Result<FinishMatchResponse, ServiceError> {
    let identity = state.identity().await;
    let mut engine = state.engine().await;
    require_active(&engine)?;

    let summary = engine.end_match().await;
    let saved = engine
        .save_match(&summary, &identity)
        .await
        .inspect_err(|err| warn!(error = %err, "finished match could not be saved"))
        .map_err(ServiceError::Unavailable)?;

    Ok(FinishMatchResponse {
        saved_id: saved.to_string(),
        summary: MatchSummaryDto::from(&summary),
    })
}

/// Zero the live score without touching storage.
pub async fn reset_match(state: &SharedState) -> MatchStateResponse {
    let mut engine = state.engine().await;
    engine.reset_match();
    MatchStateResponse::from(&*engine)
}

/// Matches of the current identity that are still marked in progress.
pub async fn active_matches(state: &SharedState) -> ActiveMatchesResponse {
    let identity = state.identity().await;
    let matches = state.registry().fetch_active_matches(&identity).await;
    ActiveMatchesResponse {
        count: matches.len(),
        matches: matches.into_iter().map(MatchRecordDto::from).collect(),
    }
}

/// Close a stale in-progress match of the current identity.
pub async fn deactivate_match(state: &SharedState, id: String) -> Result<(), ServiceError> {
    let id = parse_match_id(id)?;
    let identity = state.identity().await;
    if state.registry().mark_match_inactive(&id, &identity).await {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(format!(
            "match `{id}` could not be closed"
        )))
    }
}

/// Reject blank path ids before they reach storage.
pub(crate) fn parse_match_id(raw: String) -> Result<MatchId, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::InvalidInput("match id must not be blank".into()));
    }
    Ok(MatchId::new(raw))
}

fn require_active(engine: &MatchEngine) -> Result<(), ServiceError> {
    if engine.is_match_active() {
        Ok(())
    } else {
        Err(ServiceError::InvalidState("no match in progress".into()))
    }
}
