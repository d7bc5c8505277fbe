use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{MatchEntity, MatchType, Side},
    dto::format_timestamp,
    state::{
        engine::{MatchEngine, MatchPhase},
        match_state::{DEFAULT_SCORING_RULE, MatchSetup, MatchSummary},
    },
};

fn default_scoring_rule() -> u32 {
    DEFAULT_SCORING_RULE
}

/// Payload used to configure and start a new match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartMatchRequest {
    #[serde(default)]
    pub match_type: MatchType,
    /// Points needed to win.
    #[serde(default = "default_scoring_rule")]
    #[validate(range(min = 1, max = 99))]
    pub scoring_rule: u32,
    #[validate(length(max = 40))]
    pub team_a_name: Option<String>,
    #[validate(length(max = 40))]
    pub team_b_name: Option<String>,
    #[serde(default)]
    pub first_server: Side,
    /// End any match still in progress instead of rejecting the request.
    #[serde(default)]
    pub replace_active: bool,
}

impl StartMatchRequest {
    pub fn to_setup(&self) -> MatchSetup {
        MatchSetup {
            match_type: self.match_type,
            scoring_rule: self.scoring_rule,
            team_a_name: self.team_a_name.clone(),
            team_b_name: self.team_b_name.clone(),
            first_server: self.first_server,
        }
        .with_default_names()
    }
}

/// Lifecycle phase exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhaseDto {
    Idle,
    Active,
    WonPendingEnd,
}

impl From<MatchPhase> for MatchPhaseDto {
    fn from(value: MatchPhase) -> Self {
        match value {
            MatchPhase::Idle => Self::Idle,
            MatchPhase::Active => Self::Active,
            MatchPhase::WonPendingEnd => Self::WonPendingEnd,
        }
    }
}

/// Full view of the live match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchStateResponse {
    pub match_id: Option<String>,
    pub phase: MatchPhaseDto,
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
    pub rally_count: u32,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
    pub started_at: String,
    pub duration_seconds: u64,
    pub can_undo: bool,
    pub is_won: bool,
}

impl From<&MatchEngine> for MatchStateResponse {
    fn from(engine: &MatchEngine) -> Self {
        let state = engine.state();
        Self {
            match_id: state.record.as_ref().map(|record| record.id.to_string()),
            phase: engine.phase().into(),
            score_a: state.score_a,
            score_b: state.score_b,
            server: state.server,
            rally_count: state.rally_count,
            match_type: state.match_type,
            scoring_rule: state.scoring_rule,
            team_a_name: state.team_a_name.clone(),
            team_b_name: state.team_b_name.clone(),
            started_at: format_timestamp(state.start_time),
            duration_seconds: engine.match_duration(),
            can_undo: engine.can_undo(),
            is_won: engine.is_match_won(),
        }
    }
}

/// Persisted match as listed in history and conflict responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchRecordDto {
    pub id: String,
    pub created_at: String,
    pub score_p1: u32,
    pub score_p2: u32,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
    pub duration_seconds: Option<u64>,
    pub rally_count: u32,
    pub server: Side,
    pub ended_at: Option<String>,
    pub is_active: bool,
}

impl From<MatchEntity> for MatchRecordDto {
    fn from(entity: MatchEntity) -> Self {
        Self {
            id: entity.id.to_string(),
            created_at: format_timestamp(entity.created_at),
            score_p1: entity.score_p1,
            score_p2: entity.score_p2,
            match_type: entity.match_type,
            scoring_rule: entity.scoring_rule,
            team_a_name: entity.team_a_name,
            team_b_name: entity.team_b_name,
            duration_seconds: entity.duration_seconds,
            rally_count: entity.rally_count,
            server: entity.server,
            ended_at: entity.ended_at.map(format_timestamp),
            is_active: entity.is_active,
        }
    }
}

/// Result of ending a match.
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchSummaryDto {
    pub match_id: Option<String>,
    pub final_score_a: u32,
    pub final_score_b: u32,
    /// Absent when the match ended on a tie.
    pub winner: Option<Side>,
    pub winner_name: Option<String>,
    pub duration_seconds: u64,
    pub rally_count: u32,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub ended_at: String,
}

impl From<&MatchSummary> for MatchSummaryDto {
    fn from(summary: &MatchSummary) -> Self {
        Self {
            match_id: summary.record.as_ref().map(|record| record.id.to_string()),
            final_score_a: summary.final_score_a,
            final_score_b: summary.final_score_b,
            winner: summary.winner,
            winner_name: summary.winner_name.clone(),
            duration_seconds: summary.duration_seconds,
            rally_count: summary.rally_count,
            match_type: summary.match_type,
            scoring_rule: summary.scoring_rule,
            ended_at: format_timestamp(summary.ended_at),
        }
    }
}

/// Summary of a finished match together with the record it was saved as.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishMatchResponse {
    pub saved_id: String,
    pub summary: MatchSummaryDto,
}

/// In-progress matches of the current identity.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActiveMatchesResponse {
    pub count: usize,
    pub matches: Vec<MatchRecordDto>,
}
