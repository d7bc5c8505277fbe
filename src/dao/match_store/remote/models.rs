use serde::Serialize;

use crate::dao::models::NewMatchEntity;

/// Row sent on insert: the match columns plus the owning user.
#[derive(Debug, Serialize)]
pub struct RemoteMatchInsert<'a> {
    #[serde(flatten)]
    pub record: &'a NewMatchEntity,
    pub user_id: &'a str,
}

/// PostgREST equality filter value.
pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{MatchType, Side};

    #[test]
    fn insert_row_flattens_match_columns() {
        let record = NewMatchEntity {
            score_p1: 11,
            score_p2: 7,
            match_type: MatchType::Doubles,
            scoring_rule: 11,
            team_a_name: Some("Ana & Bo".into()),
            team_b_name: None,
            duration_seconds: Some(620),
            rally_count: 18,
            server: Side::TeamB,
            ended_at: None,
            is_active: false,
        };
        let row = serde_json::to_value(RemoteMatchInsert {
            record: &record,
            user_id: "user-1",
        })
        .unwrap();

        assert_eq!(row["user_id"], "user-1");
        assert_eq!(row["score_p1"], 11);
        assert_eq!(row["server"], "team_b");
        assert_eq!(row["is_active"], false);
        assert!(row["team_b_name"].is_null());
        assert!(row.get("id").is_none());
    }

    #[test]
    fn bulk_rows_share_the_same_columns() {
        let finished = NewMatchEntity {
            score_p1: 11,
            score_p2: 4,
            match_type: MatchType::Singles,
            scoring_rule: 11,
            team_a_name: Some("Ana".into()),
            team_b_name: Some("Bo".into()),
            duration_seconds: Some(900),
            rally_count: 15,
            server: Side::TeamA,
            ended_at: Some(time::OffsetDateTime::UNIX_EPOCH),
            is_active: false,
        };
        let abandoned = NewMatchEntity {
            team_a_name: None,
            team_b_name: None,
            duration_seconds: None,
            ended_at: None,
            ..finished.clone()
        };
        let rows = serde_json::to_value(
            [&finished, &abandoned]
                .map(|record| RemoteMatchInsert {
                    record,
                    user_id: "user-1",
                }),
        )
        .unwrap();

        let keys = |row: &serde_json::Value| {
            let mut keys = row
                .as_object()
                .unwrap()
                .keys()
                .cloned()
                .collect::<Vec<_>>();
            keys.sort();
            keys
        };
        assert_eq!(keys(&rows[0]), keys(&rows[1]));
        assert!(rows[1]["ended_at"].is_null());
    }

    #[test]
    fn equality_filters_use_postgrest_syntax() {
        assert_eq!(eq("abc"), "eq.abc");
        assert_eq!(eq(true), "eq.true");
    }
}
