use serde::Serialize;
use utoipa::ToSchema;

use crate::{dao::models::Side, state::engine::ScoreboardSnapshot};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
/// Broadcast on every change of the live match.
pub struct ScoreboardEvent {
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
    pub rally_count: u32,
    pub is_active: bool,
    pub is_won: bool,
}

impl From<&ScoreboardSnapshot> for ScoreboardEvent {
    fn from(snapshot: &ScoreboardSnapshot) -> Self {
        Self {
            score_a: snapshot.score_a,
            score_b: snapshot.score_b,
            server: snapshot.server,
            rally_count: snapshot.rally_count,
            is_active: snapshot.is_active,
            is_won: snapshot.is_won,
        }
    }
}
