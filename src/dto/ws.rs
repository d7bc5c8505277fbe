use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dao::models::Side, state::engine::ScoreboardSnapshot};

#[derive(Debug, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
/// Commands accepted from companion devices.
#[serde(tag = "action")]
pub enum CompanionInboundMessage {
    #[serde(rename = "SCORE_A")]
    ScoreA,
    #[serde(rename = "SCORE_B")]
    ScoreB,
    #[serde(rename = "UNDO")]
    Undo,
    #[serde(other)]
    Unknown,
}

impl CompanionInboundMessage {
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Serialize, ToSchema, PartialEq, Eq)]
/// Score pushed to companion devices after every change.
#[serde(rename_all = "camelCase")]
pub struct CompanionScoreMessage {
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
}

impl From<&ScoreboardSnapshot> for CompanionScoreMessage {
    fn from(snapshot: &ScoreboardSnapshot) -> Self {
        Self {
            score_a: snapshot.score_a,
            score_b: snapshot.score_b,
            server: snapshot.server,
        }
    }
}
