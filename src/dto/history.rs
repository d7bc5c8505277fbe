use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::matches::MatchRecordDto;

/// Match history of the current identity, newest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub matches: Vec<MatchRecordDto>,
    /// Number of records stored, including hidden ones.
    pub total: usize,
    /// Set when the free tier hides older records.
    pub limited: bool,
}

/// Aggregate statistics computed over every stored match.
///
/// The user is counted as team A.
#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct StatsResponse {
    pub total_matches: usize,
    pub wins: usize,
    pub losses: usize,
    /// Rounded percentage.
    pub win_rate: u32,
    pub points_scored: u64,
    pub points_conceded: u64,
    pub current_streak: usize,
    pub is_win_streak: bool,
}
