use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

/// Prefix carried by every identifier generated on the device.
pub const LOCAL_ID_PREFIX: &str = "local_";

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const RANDOM_SUFFIX_LEN: usize = 9;

/// Format played by a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Singles,
    Doubles,
}

/// One of the two sides of a match, used both for the server and the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    TeamA,
    TeamB,
}

impl Side {
    /// The opposite side.
    pub fn other(self) -> Self {
        match self {
            Side::TeamA => Side::TeamB,
            Side::TeamB => Side::TeamA,
        }
    }
}

/// Identifier of a persisted match record.
///
/// Records created on the device use `local_<millis>_<suffix>`, which never
/// collides with identifiers handed out by the remote database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Wrap an identifier received from a backend.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Allocate a fresh device-local identifier.
    pub fn generate_local() -> Self {
        Self(format!(
            "{LOCAL_ID_PREFIX}{}_{}",
            unix_millis(OffsetDateTime::now_utc()),
            random_base36(RANDOM_SUFFIX_LEN)
        ))
    }

    /// Whether this record originates from device-local storage.
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Match record as persisted by every backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    pub id: MatchId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Score of team A.
    pub score_p1: u32,
    /// Score of team B.
    pub score_p2: u32,
    pub match_type: MatchType,
    /// Points needed to win.
    pub scoring_rule: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub rally_count: u32,
    pub server: Side,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<OffsetDateTime>,
    /// True while the match is still being scored.
    #[serde(default)]
    pub is_active: bool,
}

impl MatchEntity {
    /// Materialise a new record from an insert payload.
    pub fn from_new(id: MatchId, created_at: OffsetDateTime, new: NewMatchEntity) -> Self {
        Self {
            id,
            created_at,
            score_p1: new.score_p1,
            score_p2: new.score_p2,
            match_type: new.match_type,
            scoring_rule: new.scoring_rule,
            team_a_name: new.team_a_name,
            team_b_name: new.team_b_name,
            duration_seconds: new.duration_seconds,
            rally_count: new.rally_count,
            server: new.server,
            ended_at: new.ended_at,
            is_active: new.is_active,
        }
    }

    /// Merge the fields present in `patch`, leaving the others untouched.
    pub fn apply(&mut self, patch: MatchPatch) {
        let MatchPatch {
            score_p1,
            score_p2,
            server,
            rally_count,
            duration_seconds,
            ended_at,
            is_active,
        } = patch;

        if let Some(value) = score_p1 {
            self.score_p1 = value;
        }
        if let Some(value) = score_p2 {
            self.score_p2 = value;
        }
        if let Some(value) = server {
            self.server = value;
        }
        if let Some(value) = rally_count {
            self.rally_count = value;
        }
        if let Some(value) = duration_seconds {
            self.duration_seconds = Some(value);
        }
        if let Some(value) = ended_at {
            self.ended_at = Some(value);
        }
        if let Some(value) = is_active {
            self.is_active = value;
        }
    }
}

/// Insert payload; the backend assigns `id` and `created_at`.
///
/// Empty columns serialize as `null` so every row of a bulk insert carries
/// the same keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMatchEntity {
    pub score_p1: u32,
    pub score_p2: u32,
    pub match_type: MatchType,
    pub scoring_rule: u32,
    pub team_a_name: Option<String>,
    pub team_b_name: Option<String>,
    pub duration_seconds: Option<u64>,
    pub rally_count: u32,
    pub server: Side,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub is_active: bool,
}

impl From<MatchEntity> for NewMatchEntity {
    /// Strip the backend-assigned fields, keeping the match content.
    fn from(entity: MatchEntity) -> Self {
        Self {
            score_p1: entity.score_p1,
            score_p2: entity.score_p2,
            match_type: entity.match_type,
            scoring_rule: entity.scoring_rule,
            team_a_name: entity.team_a_name,
            team_b_name: entity.team_b_name,
            duration_seconds: entity.duration_seconds,
            rally_count: entity.rally_count,
            server: entity.server,
            ended_at: entity.ended_at,
            is_active: entity.is_active,
        }
    }
}

/// Partial update of a match record. Absent fields are left as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_p1: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_p2: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<Side>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rally_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub ended_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl MatchPatch {
    /// Patch flipping only the in-progress flag off.
    pub fn inactive() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }
}

pub(crate) fn unix_millis(at: OffsetDateTime) -> i128 {
    at.unix_timestamp_nanos() / 1_000_000
}

/// Random lowercase base-36 string used as an identifier suffix.
pub(crate) fn random_base36(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| BASE36_ALPHABET[rng.random_range(0..BASE36_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> MatchEntity {
        MatchEntity {
            id: MatchId::new("local_1_abc"),
            created_at: OffsetDateTime::UNIX_EPOCH,
            score_p1: 3,
            score_p2: 4,
            match_type: MatchType::Doubles,
            scoring_rule: 11,
            team_a_name: Some("Ana & Bo".into()),
            team_b_name: None,
            duration_seconds: None,
            rally_count: 7,
            server: Side::TeamB,
            ended_at: None,
            is_active: true,
        }
    }

    #[test]
    fn generated_local_ids_are_recognisable_and_distinct() {
        let first = MatchId::generate_local();
        let second = MatchId::generate_local();

        assert!(first.is_local());
        assert_ne!(first, second);
        let suffix = first.as_str().rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(!MatchId::new("8d4c2f9e-3b1a-4a57-9c1e-0f6e2d7b5a10").is_local());
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut record = entity();
        record.apply(MatchPatch {
            score_p1: Some(5),
            is_active: Some(false),
            ..MatchPatch::default()
        });

        assert_eq!(record.score_p1, 5);
        assert_eq!(record.score_p2, 4);
        assert_eq!(record.server, Side::TeamB);
        assert!(!record.is_active);
    }

    #[test]
    fn empty_patch_serialises_to_empty_object() {
        let json = serde_json::to_string(&MatchPatch::default()).unwrap();
        assert_eq!(json, "{}");
        let json = serde_json::to_value(MatchPatch::inactive()).unwrap();
        assert_eq!(json, serde_json::json!({ "is_active": false }));
    }

    #[test]
    fn records_without_optional_columns_deserialize() {
        let raw = r#"{
            "id": "local_1_abc",
            "created_at": "2024-05-01T10:00:00Z",
            "score_p1": 11,
            "score_p2": 9,
            "match_type": "singles",
            "scoring_rule": 11,
            "server": "team_a"
        }"#;
        let record: MatchEntity = serde_json::from_str(raw).unwrap();
        assert!(!record.is_active);
        assert_eq!(record.rally_count, 0);
        assert_eq!(record.ended_at, None);
    }
}
