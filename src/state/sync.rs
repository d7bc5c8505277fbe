//! Background mirroring of the live score onto the persisted match record.
//!
//! Only one write is ever in flight. Requests submitted while a write is
//! pending replace each other, so the worker always sends the freshest state
//! next and a stale write can never land after a newer one.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    dao::{models::MatchPatch, repository::MatchRepository},
    state::match_state::MatchRecordRef,
};

/// Latest state to push to a record.
#[derive(Debug, Clone)]
struct SyncRequest {
    generation: u64,
    record: MatchRecordRef,
    patch: MatchPatch,
}

/// Handle owned by the engine to feed the sync worker.
///
/// Dropping the handle stops the worker once its current write settles.
pub struct SyncHandle {
    requests: watch::Sender<Option<SyncRequest>>,
    completed: watch::Receiver<u64>,
    generation: u64,
}

impl SyncHandle {
    /// Start the worker on the current Tokio runtime.
    pub fn spawn(repository: MatchRepository) -> Self {
        let (requests, requests_rx) = watch::channel(None);
        let (completed_tx, completed) = watch::channel(0);
        tokio::spawn(run(repository, requests_rx, completed_tx));

        Self {
            requests,
            completed,
            generation: 0,
        }
    }

    /// Queue `patch` for `record`, superseding any request not yet picked up.
    pub fn submit(&mut self, record: MatchRecordRef, patch: MatchPatch) {
        self.generation += 1;
        self.requests.send_replace(Some(SyncRequest {
            generation: self.generation,
            record,
            patch,
        }));
    }

    /// Whether a submitted request has not been written yet.
    pub fn is_pending(&self) -> bool {
        *self.completed.borrow() < self.generation
    }

    /// Wait until everything submitted so far has been written (or failed).
    pub async fn flush(&self) {
        let target = self.generation;
        let mut completed = self.completed.clone();
        if completed.wait_for(|done| *done >= target).await.is_err() {
            warn!("sync worker stopped before flushing");
        }
    }
}

async fn run(
    repository: MatchRepository,
    mut requests: watch::Receiver<Option<SyncRequest>>,
    completed: watch::Sender<u64>,
) {
    while requests.changed().await.is_ok() {
        let Some(request) = requests.borrow_and_update().clone() else {
            continue;
        };

        let SyncRequest {
            generation,
            record,
            patch,
        } = request;
        match repository
            .update_match(&record.owner, &record.id, patch)
            .await
        {
            Ok(()) => debug!(match_id = %record.id, generation, "match synced"),
            Err(err) => warn!(match_id = %record.id, generation, error = %err, "match sync failed"),
        }

        completed.send_replace(generation);
    }
}
