use time::OffsetDateTime;

use crate::{
    dao::models::{MatchEntity, MatchId, MatchPatch, MatchType, NewMatchEntity, Side},
    state::identity::Identity,
};

/// Target score used when nothing else was chosen.
pub const DEFAULT_SCORING_RULE: u32 = 11;

/// Match configuration chosen before the first point, consumed by
/// [`MatchEngine::start_match`](crate::state::engine::MatchEngine::start_match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSetup {
    pub match_type: MatchType,
    /// Points needed to win.
    pub scoring_rule: u32,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
    pub first_server: Side,
}

impl MatchSetup {
    pub fn new(match_type: MatchType, scoring_rule: u32) -> Self {
        Self {
            match_type,
            scoring_rule,
            team_a_name: None,
            team_b_name: None,
            first_server: Side::TeamA,
        }
    }

    pub fn with_team_names(mut self, team_a: impl Into<String>, team_b: impl Into<String>) -> Self {
        self.team_a_name = Some(team_a.into());
        self.team_b_name = Some(team_b.into());
        self
    }

    pub fn with_first_server(mut self, server: Side) -> Self {
        self.first_server = server;
        self
    }

    /// Fill blank team names with the labels shown on the scoreboard.
    pub fn with_default_names(mut self) -> Self {
        let (default_a, default_b) = match self.match_type {
            MatchType::Singles => ("Player 1", "Player 2"),
            MatchType::Doubles => ("P1 & P2", "P3 & P4"),
        };
        self.team_a_name = non_blank(self.team_a_name).or_else(|| Some(default_a.to_owned()));
        self.team_b_name = non_blank(self.team_b_name).or_else(|| Some(default_b.to_owned()));
        self
    }
}

fn non_blank(name: Option<String>) -> Option<String> {
    name.map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
}

/// Persisted record backing the live match, bound to the identity that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecordRef {
    pub id: MatchId,
    pub owner: Identity,
}

/// Score-related fields captured before every mutation so undo can restore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSnapshot {
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
    pub rally_count: u32,
}

impl ScoreSnapshot {
    /// Patch carrying exactly the fields mirrored on every score change.
    pub fn to_patch(self) -> MatchPatch {
        MatchPatch {
            score_p1: Some(self.score_a),
            score_p2: Some(self.score_b),
            server: Some(self.server),
            rally_count: Some(self.rally_count),
            ..MatchPatch::default()
        }
    }
}

/// Live state of the match being scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    /// Absent until the match has been persisted once.
    pub record: Option<MatchRecordRef>,
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
    pub rally_count: u32,
    pub start_time: OffsetDateTime,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
}

impl Default for MatchState {
    fn default() -> Self {
        Self {
            record: None,
            score_a: 0,
            score_b: 0,
            server: Side::TeamA,
            rally_count: 0,
            start_time: OffsetDateTime::now_utc(),
            match_type: MatchType::Singles,
            scoring_rule: DEFAULT_SCORING_RULE,
            team_a_name: None,
            team_b_name: None,
        }
    }
}

impl MatchState {
    /// Zeroed state for a freshly configured match.
    pub fn from_setup(setup: MatchSetup, start_time: OffsetDateTime) -> Self {
        Self {
            record: None,
            score_a: 0,
            score_b: 0,
            server: setup.first_server,
            rally_count: 0,
            start_time,
            match_type: setup.match_type,
            scoring_rule: setup.scoring_rule,
            team_a_name: setup.team_a_name,
            team_b_name: setup.team_b_name,
        }
    }

    /// Rehydrate a match that was still in progress when the app stopped.
    pub fn from_entity(entity: MatchEntity, owner: Identity) -> Self {
        Self {
            record: Some(MatchRecordRef {
                id: entity.id,
                owner,
            }),
            score_a: entity.score_p1,
            score_b: entity.score_p2,
            server: entity.server,
            rally_count: entity.rally_count,
            start_time: entity.created_at,
            match_type: entity.match_type,
            scoring_rule: entity.scoring_rule,
            team_a_name: entity.team_a_name,
            team_b_name: entity.team_b_name,
        }
    }

    pub fn score_snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot {
            score_a: self.score_a,
            score_b: self.score_b,
            server: self.server,
            rally_count: self.rally_count,
        }
    }

    pub fn restore(&mut self, snapshot: ScoreSnapshot) {
        self.score_a = snapshot.score_a;
        self.score_b = snapshot.score_b;
        self.server = snapshot.server;
        self.rally_count = snapshot.rally_count;
    }

    /// First to reach the target wins; no win-by-two rule.
    pub fn is_won(&self) -> bool {
        self.score_a.max(self.score_b) >= self.scoring_rule
    }

    /// Whole seconds elapsed since the match started.
    pub fn elapsed_seconds(&self, now: OffsetDateTime) -> u64 {
        u64::try_from((now - self.start_time).whole_seconds()).unwrap_or(0)
    }

    /// Insert payload for the in-progress record created at match start.
    pub fn to_active_entity(&self) -> NewMatchEntity {
        NewMatchEntity {
            score_p1: self.score_a,
            score_p2: self.score_b,
            match_type: self.match_type,
            scoring_rule: self.scoring_rule,
            team_a_name: self.team_a_name.clone(),
            team_b_name: self.team_b_name.clone(),
            duration_seconds: None,
            rally_count: self.rally_count,
            server: self.server,
            ended_at: None,
            is_active: true,
        }
    }
}

/// Kind of mutation recorded on the undo stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    ScoreA,
    ScoreB,
    SwitchServer,
}

/// Undo record: what happened and the full score state right before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAction {
    pub kind: ActionKind,
    pub timestamp: OffsetDateTime,
    pub previous: ScoreSnapshot,
}

/// Immutable result handed out when a match ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    /// Record backing this match, if it was ever persisted.
    pub record: Option<MatchRecordRef>,
    pub final_score_a: u32,
    pub final_score_b: u32,
    /// `None` when the match ended on a tie.
    pub winner: Option<Side>,
    pub winner_name: Option<String>,
    pub duration_seconds: u64,
    pub rally_count: u32,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub server: Side,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
    pub ended_at: OffsetDateTime,
}

impl MatchSummary {
    /// Final statistics written onto the match record.
    pub fn to_final_patch(&self) -> MatchPatch {
        MatchPatch {
            score_p1: Some(self.final_score_a),
            score_p2: Some(self.final_score_b),
            server: Some(self.server),
            rally_count: Some(self.rally_count),
            duration_seconds: Some(self.duration_seconds),
            ended_at: Some(self.ended_at),
            is_active: Some(false),
        }
    }

    /// Finished record for a match that never reached storage while live.
    pub fn to_finished_entity(&self) -> NewMatchEntity {
        NewMatchEntity {
            score_p1: self.final_score_a,
            score_p2: self.final_score_b,
            match_type: self.match_type,
            scoring_rule: self.scoring_rule,
            team_a_name: self.team_a_name.clone(),
            team_b_name: self.team_b_name.clone(),
            duration_seconds: Some(self.duration_seconds),
            rally_count: self.rally_count,
            server: self.server,
            ended_at: Some(self.ended_at),
            is_active: false,
        }
    }
}
