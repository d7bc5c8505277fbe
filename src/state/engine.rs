//! Match state engine: the single owner of the live match.
//!
//! Scoring calls mutate memory synchronously and hand the new score to the
//! sync worker; persistence never blocks or rolls back the live match.

use std::{cmp::Ordering, time::Duration};

use time::OffsetDateTime;
use tokio::{sync::watch, time::timeout};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::{MatchId, Side},
        repository::MatchRepository,
        storage::{StorageError, StorageResult},
    },
    services::active_matches::ActiveMatchRegistry,
    state::{
        identity::Identity,
        match_state::{
            ActionKind, MatchAction, MatchRecordRef, MatchSetup, MatchState, MatchSummary,
        },
        sync::SyncHandle,
    },
};

/// Upper bound on how long `end_match` waits for a pending score sync.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle phase, derived from the stored flags and the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Idle,
    Active,
    /// A side reached the target; waiting for the caller to end the match.
    WonPendingEnd,
}

/// Observable projection pushed to companion devices and the scoreboard feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScoreboardSnapshot {
    pub score_a: u32,
    pub score_b: u32,
    pub server: Side,
    pub rally_count: u32,
    pub is_active: bool,
    pub is_won: bool,
}

/// Owner of the in-progress match, its undo history and its persistence link.
pub struct MatchEngine {
    state: MatchState,
    undo_stack: Vec<MatchAction>,
    is_active: bool,
    repository: MatchRepository,
    sync: SyncHandle,
    scoreboard: watch::Sender<ScoreboardSnapshot>,
    flush_timeout: Duration,
}

impl MatchEngine {
    /// Build an idle engine. Must be called inside a Tokio runtime because the
    /// sync worker is spawned here.
    pub fn new(repository: MatchRepository, flush_timeout: Duration) -> Self {
        let (scoreboard, _rx) = watch::channel(ScoreboardSnapshot::default());
        Self {
            state: MatchState::default(),
            undo_stack: Vec::new(),
            is_active: false,
            sync: SyncHandle::spawn(repository.clone()),
            repository,
            scoreboard,
            flush_timeout,
        }
    }

    /// Receive a [`ScoreboardSnapshot`] after every change.
    pub fn subscribe(&self) -> watch::Receiver<ScoreboardSnapshot> {
        self.scoreboard.subscribe()
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn is_match_active(&self) -> bool {
        self.is_active
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn phase(&self) -> MatchPhase {
        match (self.is_active, self.is_match_won()) {
            (false, _) => MatchPhase::Idle,
            (true, false) => MatchPhase::Active,
            (true, true) => MatchPhase::WonPendingEnd,
        }
    }

    pub fn snapshot(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot {
            score_a: self.state.score_a,
            score_b: self.state.score_b,
            server: self.state.server,
            rally_count: self.state.rally_count,
            is_active: self.is_active,
            is_won: self.is_match_won(),
        }
    }

    /// Begin a new match owned by `owner`.
    ///
    /// The in-progress record is created best-effort: when storage fails the
    /// match still runs in memory and later syncs are skipped.
    pub async fn start_match(&mut self, setup: MatchSetup, owner: Identity) {
        let mut state = MatchState::from_setup(setup, OffsetDateTime::now_utc());

        match self
            .repository
            .save_match(&owner, state.to_active_entity())
            .await
        {
            Ok(created) => {
                info!(match_id = %created.id, %owner, "match started");
                state.record = Some(MatchRecordRef {
                    id: created.id,
                    owner,
                });
            }
            Err(err) => {
                warn!(%owner, error = %err, "could not create match record; continuing offline");
            }
        }

        self.state = state;
        self.undo_stack.clear();
        self.is_active = true;
        self.publish();
    }

    pub fn score_team_a(&mut self) {
        self.apply(ActionKind::ScoreA);
    }

    pub fn score_team_b(&mut self) {
        self.apply(ActionKind::ScoreB);
    }

    pub fn switch_server(&mut self) {
        self.apply(ActionKind::SwitchServer);
    }

    /// Restore the state captured before the most recent action.
    pub fn undo(&mut self) {
        let Some(action) = self.undo_stack.pop() else {
            return;
        };
        debug!(kind = ?action.kind, "undoing action");
        self.state.restore(action.previous);
        self.changed();
    }

    pub fn is_match_won(&self) -> bool {
        self.state.is_won()
    }

    /// Whole seconds since the start of the active match, zero when idle.
    pub fn match_duration(&self) -> u64 {
        if !self.is_active {
            return 0;
        }
        self.state.elapsed_seconds(OffsetDateTime::now_utc())
    }

    /// Finish the match: write its final stats and produce the summary.
    ///
    /// Storage failures are logged only. The live state is left in place
    /// until the next `start_match` or `reset_match`.
    pub async fn end_match(&mut self) -> MatchSummary {
        let ended_at = OffsetDateTime::now_utc();
        let winner = match self.state.score_a.cmp(&self.state.score_b) {
            Ordering::Greater => Some(Side::TeamA),
            Ordering::Less => Some(Side::TeamB),
            Ordering::Equal => {
                warn!(
                    score = self.state.score_a,
                    "match ended on a tie; no winner recorded"
                );
                None
            }
        };
        let winner_name = winner.and_then(|side| match side {
            Side::TeamA => self.state.team_a_name.clone(),
            Side::TeamB => self.state.team_b_name.clone(),
        });

        let summary = MatchSummary {
            record: self.state.record.clone(),
            final_score_a: self.state.score_a,
            final_score_b: self.state.score_b,
            winner,
            winner_name,
            duration_seconds: self.state.elapsed_seconds(ended_at),
            rally_count: self.state.rally_count,
            match_type: self.state.match_type,
            scoring_rule: self.state.scoring_rule,
            server: self.state.server,
            team_a_name: self.state.team_a_name.clone(),
            team_b_name: self.state.team_b_name.clone(),
            ended_at,
        };

        if let Some(record) = &summary.record {
            if timeout(self.flush_timeout, self.sync.flush()).await.is_err() {
                warn!(match_id = %record.id, "pending score sync did not settle before match end");
            }
            if let Err(err) = self
                .repository
                .update_match(&record.owner, &record.id, summary.to_final_patch())
                .await
            {
                warn!(match_id = %record.id, error = %err, "could not finalize match record");
            }
        }

        self.is_active = false;
        self.undo_stack.clear();
        self.publish();

        info!(
            score_a = summary.final_score_a,
            score_b = summary.final_score_b,
            duration = summary.duration_seconds,
            "match ended"
        );
        summary
    }

    /// Persist the finished match as its single record.
    ///
    /// The record created at start is updated in place; a match that never
    /// reached storage is inserted once, owned by `current`.
    pub async fn save_match(
        &self,
        summary: &MatchSummary,
        current: &Identity,
    ) -> StorageResult<MatchId> {
        if let Some(record) = &summary.record {
            match self
                .repository
                .update_match(&record.owner, &record.id, summary.to_final_patch())
                .await
            {
                Ok(()) => return Ok(record.id.clone()),
                Err(StorageError::NotFound(_)) => {
                    warn!(match_id = %record.id, "match record vanished; saving a new one");
                    let created = self
                        .repository
                        .save_match(&record.owner, summary.to_finished_entity())
                        .await?;
                    return Ok(created.id);
                }
                Err(err) => return Err(err),
            }
        }

        let created = self
            .repository
            .save_match(current, summary.to_finished_entity())
            .await?;
        Ok(created.id)
    }

    /// Local restart: zero the score and forget history without touching storage.
    pub fn reset_match(&mut self) {
        self.state.score_a = 0;
        self.state.score_b = 0;
        self.state.rally_count = 0;
        self.state.start_time = OffsetDateTime::now_utc();
        self.state.record = None;
        self.undo_stack.clear();
        self.is_active = false;
        self.publish();
    }

    /// Resume the newest in-progress match of `identity`, if any.
    ///
    /// Returns the restored record id. Lookup failures are logged and treated
    /// as "nothing to restore".
    pub async fn restore(&mut self, identity: &Identity) -> Option<MatchId> {
        if self.is_active {
            debug!("match already active; skipping restoration");
            return None;
        }

        let registry = ActiveMatchRegistry::new(self.repository.clone());
        let entity = registry.get_first_active_match(identity).await?;
        let id = entity.id.clone();

        self.state = MatchState::from_entity(entity, identity.clone());
        self.undo_stack.clear();
        self.is_active = true;
        self.publish();

        info!(match_id = %id, %identity, "restored active match");
        Some(id)
    }

    /// Wait, at most the flush timeout, for the last score change to be written.
    pub async fn settle(&self) {
        if timeout(self.flush_timeout, self.sync.flush()).await.is_err() {
            warn!("pending score sync did not settle in time");
        }
    }

    /// Record of the match being played, if it reached storage.
    pub fn live_record(&self) -> Option<&MatchRecordRef> {
        self.state.record.as_ref().filter(|_| self.is_active)
    }

    /// Move the live match's record to `owner` so it keeps a single row.
    ///
    /// The new active row is written before the old one is dropped; a failed
    /// delete leaves a stale copy behind rather than losing the match.
    pub async fn rehome(&mut self, owner: &Identity) -> StorageResult<Option<MatchId>> {
        let Some(previous) = self.live_record().cloned() else {
            return Ok(None);
        };
        if &previous.owner == owner {
            return Ok(None);
        }

        self.settle().await;
        let created = self
            .repository
            .save_match(owner, self.state.to_active_entity())
            .await?;
        if let Err(err) = self
            .repository
            .delete_match(&previous.owner, &previous.id)
            .await
        {
            warn!(match_id = %previous.id, error = %err, "previous live record left behind");
        }

        info!(from = %previous.id, to = %created.id, %owner, "live match moved");
        self.state.record = Some(MatchRecordRef {
            id: created.id.clone(),
            owner: owner.clone(),
        });
        Ok(Some(created.id))
    }

    fn apply(&mut self, kind: ActionKind) {
        self.undo_stack.push(MatchAction {
            kind,
            timestamp: OffsetDateTime::now_utc(),
            previous: self.state.score_snapshot(),
        });

        match kind {
            ActionKind::ScoreA => {
                self.state.score_a += 1;
                self.state.rally_count += 1;
            }
            ActionKind::ScoreB => {
                self.state.score_b += 1;
                self.state.rally_count += 1;
            }
            ActionKind::SwitchServer => {
                self.state.server = self.state.server.other();
            }
        }

        self.changed();
    }

    /// Broadcast the new score and mirror it onto the record when there is one.
    fn changed(&mut self) {
        self.publish();
        if !self.is_active {
            return;
        }
        if let Some(record) = &self.state.record {
            self.sync
                .submit(record.clone(), self.state.score_snapshot().to_patch());
        }
    }

    fn publish(&self) {
        self.scoreboard.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::{
            match_store::{
                MatchStore,
                local::{LocalMatchStore, MemoryDeviceStorage},
                testing::FakeRemote,
            },
            models::MatchType,
        },
        state::{
            identity::{GuestId, UserId},
            match_state::ScoreSnapshot,
        },
    };

    struct Harness {
        local: LocalMatchStore,
        remote: FakeRemote,
        repository: MatchRepository,
    }

    impl Harness {
        fn new() -> Self {
            let local = LocalMatchStore::new(Arc::new(MemoryDeviceStorage::new()));
            let remote = FakeRemote::new();
            let repository =
                MatchRepository::new(Arc::new(local.clone()), Some(Arc::new(remote.clone())));
            Self {
                local,
                remote,
                repository,
            }
        }

        fn engine(&self) -> MatchEngine {
            MatchEngine::new(self.repository.clone(), DEFAULT_FLUSH_TIMEOUT)
        }
    }

    fn guest() -> Identity {
        Identity::Local(GuestId::new("guest_1_abc"))
    }

    fn user() -> UserId {
        UserId::new("user-1")
    }

    fn singles_to_11() -> MatchSetup {
        MatchSetup::new(MatchType::Singles, 11).with_team_names("Ana", "Bo")
    }

    fn run_script(engine: &mut MatchEngine, script: &str) {
        for step in script.chars() {
            match step {
                'a' => engine.score_team_a(),
                'b' => engine.score_team_b(),
                's' => engine.switch_server(),
                other => panic!("unknown step {other}"),
            }
        }
    }

    #[tokio::test]
    async fn rehome_moves_the_live_record_and_keeps_scoring_there() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "aab");
        let account = Identity::Remote(user());

        let moved = engine.rehome(&account).await.unwrap().unwrap();

        assert!(harness.local.list_matches().await.unwrap().is_empty());
        assert_eq!(engine.live_record().unwrap().owner, account);
        run_script(&mut engine, "a");
        let summary = engine.end_match().await;
        let saved = engine.save_match(&summary, &account).await.unwrap();

        assert_eq!(saved, moved);
        let rows = harness.remote.rows_for(&user());
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].score_p1, rows[0].score_p2), (3, 1));
        assert!(!rows[0].is_active);
        assert!(harness.local.list_matches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rehome_without_a_live_match_is_a_no_op() {
        let harness = Harness::new();
        let mut engine = harness.engine();

        assert_eq!(engine.rehome(&Identity::Remote(user())).await.unwrap(), None);
        assert_eq!(harness.remote.row_count(), 0);
    }

    #[tokio::test]
    async fn start_match_resets_state_and_creates_active_record() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "aab");

        engine.start_match(singles_to_11(), guest()).await;

        let state = engine.state();
        assert_eq!((state.score_a, state.score_b, state.rally_count), (0, 0, 0));
        assert!(engine.is_match_active());
        assert!(!engine.can_undo());
        assert_eq!(engine.phase(), MatchPhase::Active);

        let record = state.record.as_ref().unwrap();
        assert!(record.id.is_local());
        let active = harness.local.list_active_matches().await.unwrap();
        assert!(active.iter().any(|entity| entity.id == record.id));
    }

    #[tokio::test]
    async fn undo_round_trips_any_action_sequence() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "abs");

        for script in ["a", "bbsa", "sasbsb", "aaaaabbbbbbbbbbbbbbs", "ssss"] {
            let before = engine.state().score_snapshot();
            let depth = engine.undo_depth();

            run_script(&mut engine, script);
            for _ in 0..script.len() {
                engine.undo();
            }

            assert_eq!(engine.state().score_snapshot(), before, "script {script}");
            assert_eq!(engine.undo_depth(), depth);
        }
    }

    #[tokio::test]
    async fn undo_on_empty_stack_is_a_no_op() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;

        let before = engine.state().clone();
        engine.undo();

        assert_eq!(engine.state(), &before);
        assert_eq!(engine.undo_depth(), 0);
    }

    #[tokio::test]
    async fn undo_restores_the_literal_script() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;

        run_script(&mut engine, "aaaaabbb");
        engine.undo();
        engine.undo();
        let state = engine.state();
        assert_eq!((state.score_a, state.score_b, state.rally_count), (5, 1, 6));

        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "aaaabbba");
        engine.undo();
        engine.undo();
        let state = engine.state();
        assert_eq!((state.score_a, state.score_b, state.rally_count), (4, 2, 6));
    }

    #[tokio::test]
    async fn switch_server_touches_only_the_server() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine
            .start_match(singles_to_11().with_first_server(Side::TeamB), guest())
            .await;

        engine.switch_server();
        assert_eq!(
            engine.state().score_snapshot(),
            ScoreSnapshot {
                score_a: 0,
                score_b: 0,
                server: Side::TeamA,
                rally_count: 0,
            }
        );
        engine.undo();
        assert_eq!(engine.state().server, Side::TeamB);
    }

    #[tokio::test]
    async fn reaching_the_target_wins_and_names_the_winner() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;

        run_script(&mut engine, "bbbbbbbbb");
        run_script(&mut engine, "aaaaaaaaaa");
        assert!(!engine.is_match_won());
        engine.score_team_a();
        assert!(engine.is_match_won());
        assert_eq!(engine.phase(), MatchPhase::WonPendingEnd);

        engine.score_team_a();
        assert_eq!(engine.state().score_a, 12);

        let summary = engine.end_match().await;
        assert_eq!(summary.winner, Some(Side::TeamA));
        assert_eq!(summary.winner_name.as_deref(), Some("Ana"));
        assert_eq!(summary.rally_count, 21);
    }

    #[tokio::test]
    async fn ten_all_is_not_won() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "abababababababababab");

        assert!(!engine.is_match_won());
        assert_eq!(engine.phase(), MatchPhase::Active);
    }

    #[tokio::test]
    async fn tie_at_end_records_no_winner() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "ab");

        let summary = engine.end_match().await;
        assert_eq!(summary.winner, None);
        assert_eq!(summary.winner_name, None);
    }

    #[tokio::test]
    async fn ending_stops_the_clock_and_the_history() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        assert_eq!(engine.match_duration(), 0);

        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "ab");
        engine.end_match().await;

        assert_eq!(engine.match_duration(), 0);
        assert!(!engine.is_match_active());
        assert!(!engine.can_undo());
        assert_eq!(engine.phase(), MatchPhase::Idle);
        assert_eq!(engine.state().score_a, 1);
    }

    #[tokio::test]
    async fn score_changes_are_mirrored_to_the_record() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine
            .start_match(singles_to_11(), Identity::Remote(user()))
            .await;

        run_script(&mut engine, "aabs");
        engine.sync.flush().await;

        let rows = harness.remote.rows_for(&user());
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].score_p1, rows[0].score_p2), (2, 1));
        assert_eq!(rows[0].rally_count, 3);
        assert_eq!(rows[0].server, Side::TeamB);
        assert!(rows[0].is_active);
    }

    #[tokio::test]
    async fn end_and_save_leave_exactly_one_finished_record() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "aaaaaaaaaaab");

        let summary = engine.end_match().await;
        let saved = engine.save_match(&summary, &guest()).await.unwrap();

        let records = harness.local.list_matches().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, saved);
        assert!(!records[0].is_active);
        assert_eq!((records[0].score_p1, records[0].score_p2), (11, 1));
        assert_eq!(records[0].rally_count, 12);
        assert!(records[0].ended_at.is_some());
        assert!(records[0].duration_seconds.is_some());
    }

    #[tokio::test]
    async fn offline_start_keeps_scoring_and_saves_once_back_online() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        harness.remote.fail_writes(true);

        engine
            .start_match(singles_to_11(), Identity::Remote(user()))
            .await;
        assert!(engine.is_match_active());
        assert!(engine.state().record.is_none());

        run_script(&mut engine, "aab");
        let summary = engine.end_match().await;
        assert!(engine.save_match(&summary, &Identity::Remote(user())).await.is_err());

        harness.remote.fail_writes(false);
        engine
            .save_match(&summary, &Identity::Remote(user()))
            .await
            .unwrap();
        let rows = harness.remote.rows_for(&user());
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_active);
        assert_eq!(rows[0].score_p1, 2);
    }

    #[tokio::test]
    async fn restore_resumes_the_newest_active_match() {
        let harness = Harness::new();
        {
            let mut engine = harness.engine();
            engine.start_match(singles_to_11(), guest()).await;
            run_script(&mut engine, "aaab");
            engine.sync.flush().await;
        }

        let mut engine = harness.engine();
        let restored = engine.restore(&guest()).await;

        assert!(restored.is_some());
        assert!(engine.is_match_active());
        let state = engine.state();
        assert_eq!((state.score_a, state.score_b, state.rally_count), (3, 1, 4));
        assert_eq!(state.team_a_name.as_deref(), Some("Ana"));
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn restore_without_active_match_stays_idle() {
        let harness = Harness::new();
        let mut engine = harness.engine();

        assert_eq!(engine.restore(&guest()).await, None);
        assert_eq!(engine.phase(), MatchPhase::Idle);
    }

    #[tokio::test]
    async fn reset_clears_score_without_touching_storage() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        engine.start_match(singles_to_11(), guest()).await;
        run_script(&mut engine, "aab");
        engine.sync.flush().await;

        engine.reset_match();

        assert_eq!(engine.state().score_snapshot().rally_count, 0);
        assert!(!engine.is_match_active());
        assert!(!engine.can_undo());
        let active = harness.local.list_active_matches().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].score_p1, 2);
    }

    #[tokio::test]
    async fn observers_see_every_change() {
        let harness = Harness::new();
        let mut engine = harness.engine();
        let mut scoreboard = engine.subscribe();

        engine.start_match(singles_to_11(), guest()).await;
        engine.score_team_b();

        assert!(scoreboard.has_changed().unwrap());
        let seen = scoreboard.borrow_and_update().clone();
        assert_eq!(seen.score_b, 1);
        assert!(seen.is_active);
    }
}
