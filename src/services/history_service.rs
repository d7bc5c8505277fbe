use crate::{
    dao::models::MatchEntity,
    dto::{
        history::{HistoryResponse, StatsResponse},
        matches::MatchRecordDto,
    },
    error::ServiceError,
    services::match_service::parse_match_id,
    state::SharedState,
};

/// Stored matches of the current identity, newest first.
///
/// Without the pro entitlement only the most recent entries are returned.
pub async fn list_history(state: &SharedState) -> Result<HistoryResponse, ServiceError> {
    let session = state.session().await;
    let matches = state
        .repository()
        .get_matches(&session.identity())
        .await?;

    let total = matches.len();
    let limit = if session.is_pro {
        total
    } else {
        state.config().free_history_limit
    };

    Ok(HistoryResponse {
        limited: total > limit,
        total,
        matches: matches
            .into_iter()
            .take(limit)
            .map(MatchRecordDto::from)
            .collect(),
    })
}

/// Delete one stored match of the current identity.
pub async fn delete_match(state: &SharedState, id: String) -> Result<(), ServiceError> {
    let id = parse_match_id(id)?;
    let identity = state.identity().await;
    state.repository().delete_match(&identity, &id).await?;
    Ok(())
}

/// Pro-only aggregate statistics.
pub async fn stats(state: &SharedState) -> Result<StatsResponse, ServiceError> {
    let session = state.session().await;
    if !session.is_pro {
        return Err(ServiceError::Forbidden(
            "statistics require the pro tier".into(),
        ));
    }

    let matches = state
        .repository()
        .get_matches(&session.identity())
        .await?;
    Ok(compute_stats(&matches))
}

/// `matches` must be ordered newest first for the streak to be meaningful.
pub fn compute_stats(matches: &[MatchEntity]) -> StatsResponse {
    let is_win = |entity: &MatchEntity| entity.score_p1 > entity.score_p2;

    let total_matches = matches.len();
    let wins = matches.iter().filter(|entity| is_win(entity)).count();
    let win_rate = if total_matches == 0 {
        0
    } else {
        (wins as f64 * 100.0 / total_matches as f64).round() as u32
    };

    let (current_streak, is_win_streak) = match matches.first() {
        None => (0, true),
        Some(latest) => {
            let streak_kind = is_win(latest);
            let streak = matches
                .iter()
                .take_while(|entity| is_win(entity) == streak_kind)
                .count();
            (streak, streak_kind)
        }
    };

    StatsResponse {
        total_matches,
        wins,
        losses: total_matches - wins,
        win_rate,
        points_scored: matches.iter().map(|entity| u64::from(entity.score_p1)).sum(),
        points_conceded: matches.iter().map(|entity| u64::from(entity.score_p2)).sum(),
        current_streak,
        is_win_streak,
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::{
        dao::models::{MatchId, MatchType, NewMatchEntity, Side},
        state::{
            identity::{GuestId, Session},
            testing::in_memory_state,
        },
    };

    fn finished(score_p1: u32, score_p2: u32) -> NewMatchEntity {
        NewMatchEntity {
            score_p1,
            score_p2,
            match_type: MatchType::Singles,
            scoring_rule: 11,
            team_a_name: None,
            team_b_name: None,
            duration_seconds: Some(300),
            rally_count: score_p1 + score_p2,
            server: Side::TeamA,
            ended_at: Some(OffsetDateTime::now_utc()),
            is_active: false,
        }
    }

    fn entity(score_p1: u32, score_p2: u32) -> MatchEntity {
        MatchEntity::from_new(
            MatchId::generate_local(),
            OffsetDateTime::now_utc(),
            finished(score_p1, score_p2),
        )
    }

    #[test]
    fn stats_follow_the_newest_streak() {
        let matches = [
            entity(11, 4),
            entity(11, 9),
            entity(7, 11),
            entity(11, 2),
        ];

        let stats = compute_stats(&matches);

        assert_eq!(stats.total_matches, 4);
        assert_eq!(stats.wins, 3);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.win_rate, 75);
        assert_eq!(stats.points_scored, 40);
        assert_eq!(stats.points_conceded, 26);
        assert_eq!((stats.current_streak, stats.is_win_streak), (2, true));
    }

    #[test]
    fn ties_count_as_losses() {
        let stats = compute_stats(&[entity(5, 5), entity(3, 11), entity(11, 1)]);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.win_rate, 33);
        assert_eq!((stats.current_streak, stats.is_win_streak), (2, false));
    }

    #[test]
    fn no_matches_means_zeroed_stats() {
        assert_eq!(
            compute_stats(&[]),
            StatsResponse {
                is_win_streak: true,
                ..StatsResponse::default()
            }
        );
    }

    #[tokio::test]
    async fn free_tier_sees_the_five_newest() {
        let (state, _) = in_memory_state(Session {
            guest_id: Some(GuestId::new("guest_1_abc")),
            ..Session::default()
        });
        let identity = state.identity().await;
        for score in 0..7 {
            state
                .repository()
                .save_match(&identity, finished(score, 11))
                .await
                .unwrap();
        }

        let history = list_history(&state).await.unwrap();
        assert_eq!(history.matches.len(), 5);
        assert_eq!(history.total, 7);
        assert!(history.limited);

        assert!(matches!(
            stats(&state).await,
            Err(ServiceError::Forbidden(_))
        ));

        state.update_session(|session| session.is_pro = true).await;
        let history = list_history(&state).await.unwrap();
        assert_eq!(history.matches.len(), 7);
        assert!(!history.limited);
        assert_eq!(stats(&state).await.unwrap().losses, 7);
    }
}
