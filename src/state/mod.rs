pub mod engine;
pub mod identity;
pub mod match_state;
pub mod sync;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{match_store::local::DeviceStorage, repository::MatchRepository},
    services::active_matches::ActiveMatchRegistry,
};

use self::{
    engine::{MatchEngine, ScoreboardSnapshot},
    identity::{Identity, Session},
};

pub type SharedState = Arc<AppState>;

#[derive(Clone, Debug)]
/// Bookkeeping for a connected companion device.
pub struct CompanionConnection {
    pub id: Uuid,
    pub connected_at: time::OffsetDateTime,
}

/// Central application state: the live match, its persistence and the session.
pub struct AppState {
    config: Arc<AppConfig>,
    repository: MatchRepository,
    device: Arc<dyn DeviceStorage>,
    engine: Mutex<MatchEngine>,
    scoreboard: watch::Receiver<ScoreboardSnapshot>,
    session: RwLock<Session>,
    companions: DashMap<Uuid, CompanionConnection>,
}

impl AppState {
    /// Wire the engine onto `repository` and wrap everything in an [`Arc`].
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(
        config: AppConfig,
        repository: MatchRepository,
        device: Arc<dyn DeviceStorage>,
        session: Session,
    ) -> SharedState {
        let engine = MatchEngine::new(repository.clone(), config.sync_flush_timeout);
        let scoreboard = engine.subscribe();
        Arc::new(Self {
            config: Arc::new(config),
            repository,
            device,
            engine: Mutex::new(engine),
            scoreboard,
            session: RwLock::new(session),
            companions: DashMap::new(),
        })
    }

    pub fn config(&self) -> Arc<AppConfig> {
        self.config.clone()
    }

    pub fn repository(&self) -> &MatchRepository {
        &self.repository
    }

    pub fn registry(&self) -> ActiveMatchRegistry {
        ActiveMatchRegistry::new(self.repository.clone())
    }

    /// Device slots, also used for values outside the match store.
    pub fn device(&self) -> &Arc<dyn DeviceStorage> {
        &self.device
    }

    /// Exclusive access to the live match.
    pub async fn engine(&self) -> MutexGuard<'_, MatchEngine> {
        self.engine.lock().await
    }

    /// Receive a [`ScoreboardSnapshot`] after every change of the live match.
    pub fn scoreboard(&self) -> watch::Receiver<ScoreboardSnapshot> {
        self.scoreboard.clone()
    }

    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Routing identity derived from the current session.
    pub async fn identity(&self) -> Identity {
        self.session.read().await.identity()
    }

    /// Mutate the session in place and return the updated copy.
    pub async fn update_session<F>(&self, update: F) -> Session
    where
        F: FnOnce(&mut Session),
    {
        let mut guard = self.session.write().await;
        update(&mut guard);
        guard.clone()
    }

    /// Registry of connected companion devices keyed by connection id.
    pub fn companions(&self) -> &DashMap<Uuid, CompanionConnection> {
        &self.companions
    }
}
