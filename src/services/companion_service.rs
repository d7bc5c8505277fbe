//! Companion-device channel (e.g. a watch app) mirroring the live score.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::Side,
    dto::ws::{CompanionInboundMessage, CompanionScoreMessage},
    error::ServiceError,
    services::match_service,
    state::{CompanionConnection, SharedState, engine::ScoreboardSnapshot},
};

/// Handle the full lifecycle of a companion WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let id = Uuid::new_v4();
    state.companions().insert(
        id,
        CompanionConnection {
            id,
            connected_at: OffsetDateTime::now_utc(),
        },
    );
    info!(%id, "companion connected");

    let mut scoreboard = state.scoreboard();
    let initial = scoreboard.borrow_and_update().clone();
    if push_score(&outbound_tx, &initial).is_err() {
        disconnect(&state, id, writer_task, outbound_tx).await;
        return;
    }

    loop {
        tokio::select! {
            changed = scoreboard.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = scoreboard.borrow_and_update().clone();
                if push_score(&outbound_tx, &snapshot).is_err() {
                    break;
                }
            }
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        debug!(%id, payload = %text, "companion message");
                        match CompanionInboundMessage::from_json_str(&text) {
                            Ok(command) => {
                                if let Err(err) = apply_command(&state, command).await {
                                    warn!(%id, error = %err, "companion command rejected");
                                }
                            }
                            Err(err) => warn!(%id, error = %err, "failed to parse companion message"),
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = outbound_tx.send(Message::Pong(payload));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let _ = outbound_tx.send(Message::Close(frame));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%id, error = %err, "websocket error");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    disconnect(&state, id, writer_task, outbound_tx).await;
}

/// Map a companion command onto the engine with the same rules as HTTP clients.
pub async fn apply_command(
    state: &SharedState,
    command: CompanionInboundMessage,
) -> Result<(), ServiceError> {
    match command {
        CompanionInboundMessage::ScoreA => match_service::score(state, Side::TeamA).await?,
        CompanionInboundMessage::ScoreB => match_service::score(state, Side::TeamB).await?,
        CompanionInboundMessage::Undo => match_service::undo(state).await?,
        CompanionInboundMessage::Unknown => {
            warn!("ignoring unknown companion action");
            return Ok(());
        }
    };
    Ok(())
}

/// Serialize the score and queue it for the writer task.
///
/// Only a closed writer is reported; serialization failures are logged.
fn push_score(
    tx: &mpsc::UnboundedSender<Message>,
    snapshot: &ScoreboardSnapshot,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(&CompanionScoreMessage::from(snapshot)) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize companion score");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into())).map_err(|_| ())
}

async fn disconnect(
    state: &SharedState,
    id: Uuid,
    writer_task: JoinHandle<()>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) {
    state.companions().remove(&id);
    info!(%id, "companion disconnected");
    drop(outbound_tx);
    let _ = writer_task.await;
}
