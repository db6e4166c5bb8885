//! Fan-out helpers pushing server events onto client writer channels.

use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::{dto::ws::ServerMessage, state::SharedState};

/// Serialize a server event and queue it on a writer channel.
///
/// Returns `false` when the writer is gone; callers treat that as a
/// disconnected client, never as a fatal error.
pub fn send_message_to_websocket(tx: &mpsc::UnboundedSender<Message>, event: &ServerMessage) -> bool {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server event `{event:?}`");
            return true;
        }
    };
    tx.send(Message::Text(payload.into())).is_ok()
}

/// Push an event to one player, if they are connected.
pub fn send_to_player(state: &SharedState, player_id: Uuid, event: &ServerMessage) {
    let Some(tx) = state
        .connections
        .get(&player_id)
        .map(|connection| connection.tx.clone())
    else {
        return;
    };
    if !send_message_to_websocket(&tx, event) {
        state.connections.remove(&player_id);
    }
}

/// Push an event to every listed player, serializing it once.
///
/// Recipients whose writer is gone are dropped from the registry and skipped.
pub fn broadcast(state: &SharedState, recipients: &[Uuid], event: &ServerMessage) {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server event `{event:?}`");
            return;
        }
    };

    for player_id in recipients {
        let Some(tx) = state
            .connections
            .get(player_id)
            .map(|connection| connection.tx.clone())
        else {
            continue;
        };
        if tx.send(Message::Text(payload.clone().into())).is_err() {
            state.connections.remove(player_id);
        }
    }
}

/// Push an event to every listed player except one, serializing it once.
pub fn broadcast_except(
    state: &SharedState,
    recipients: &[Uuid],
    excluded: Uuid,
    event: &ServerMessage,
) {
    let others: Vec<Uuid> = recipients
        .iter()
        .copied()
        .filter(|id| *id != excluded)
        .collect();
    broadcast(state, &others, event);
}
