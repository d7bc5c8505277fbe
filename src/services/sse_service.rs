use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::sse::{ScoreboardEvent, ServerEvent},
    state::{SharedState, engine::ScoreboardSnapshot},
};

const SCOREBOARD_EVENT: &str = "scoreboard";

/// Subscribe to live match changes.
pub fn subscribe_scoreboard(state: &SharedState) -> watch::Receiver<ScoreboardSnapshot> {
    state.scoreboard()
}

fn scoreboard_event(snapshot: &ScoreboardSnapshot) -> Option<ServerEvent> {
    ServerEvent::json(
        Some(SCOREBOARD_EVENT.to_string()),
        &ScoreboardEvent::from(snapshot),
    )
    .inspect_err(|err| warn!(error = %err, "failed to serialize scoreboard event"))
    .ok()
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a scoreboard receiver into an SSE response. The current score is
/// sent first, then one event per change until the client disconnects.
pub fn to_sse_stream(
    mut receiver: watch::Receiver<ScoreboardSnapshot>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let initial = receiver.borrow_and_update().clone();
        if let Some(payload) = scoreboard_event(&initial) {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                changed = receiver.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    // Intermediate values are skipped; only the latest score matters.
                    let snapshot = receiver.borrow_and_update().clone();
                    let Some(payload) = scoreboard_event(&snapshot) else {
                        continue;
                    };
                    if tx.send(Ok(to_event(payload))).await.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Scoreboard SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
