//! WebSocket connection lifecycle: identification, dispatch, and cleanup.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    error::ServiceError,
    services::{events, lobby_service, session_service},
    state::{ClientConnection, SharedState},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle for an individual client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let hello = serde_json::from_str::<ClientMessage>(&initial_message);
    let Ok(ClientMessage::Hello { player_id }) = hello else {
        warn!("first message was not a hello");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    // A resupplied identity survives reconnects; a fresh one is minted otherwise.
    let player_id = player_id.unwrap_or_else(Uuid::new_v4);
    state.connections.insert(
        player_id,
        ClientConnection {
            player_id,
            tx: outbound_tx.clone(),
        },
    );
    info!(%player_id, "client connected");

    events::send_message_to_websocket(&outbound_tx, &ServerMessage::Welcome { player_id });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(inbound) => {
                    if let Err(err) = dispatch(&state, player_id, inbound).await {
                        events::send_message_to_websocket(
                            &outbound_tx,
                            &ServerMessage::Error {
                                message: err.to_string(),
                            },
                        );
                    }
                }
                Err(err) => {
                    warn!(%player_id, error = %err, "failed to parse client message");
                    events::send_message_to_websocket(
                        &outbound_tx,
                        &ServerMessage::Error {
                            message: "malformed message".into(),
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%player_id, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%player_id, error = %err, "websocket error");
                break;
            }
        }
    }

    // Only unregister if the entry still belongs to this socket; a reconnect
    // may have replaced it already.
    let owned = state
        .connections
        .remove_if(&player_id, |_, connection| {
            connection.tx.same_channel(&outbound_tx)
        })
        .is_some();
    if owned {
        session_service::handle_disconnect(&state, player_id).await;
        lobby_service::handle_disconnect(&state, player_id).await;
        info!(%player_id, "client disconnected");
    }

    finalize(writer_task, outbound_tx).await;
}

/// Route one inbound message to the owning service.
async fn dispatch(
    state: &SharedState,
    player_id: Uuid,
    message: ClientMessage,
) -> Result<(), ServiceError> {
    match message {
        ClientMessage::Hello { .. } => {
            warn!(%player_id, "ignoring duplicate hello");
            Ok(())
        }
        ClientMessage::CreateRoom { name } => {
            session_service::handle_create_room(state, player_id, name).await
        }
        ClientMessage::JoinRoom { code, name } => {
            session_service::handle_join_room(state, player_id, code, name).await
        }
        ClientMessage::LeaveRoom => session_service::handle_leave_room(state, player_id).await,
        ClientMessage::StartGame => session_service::handle_start_game(state, player_id).await,
        ClientMessage::SubmitAnswer { option_index } => {
            session_service::handle_submit_answer(state, player_id, option_index).await
        }
        ClientMessage::NextQuestion => {
            session_service::handle_next_question(state, player_id).await
        }
        ClientMessage::JoinLobby { name } => {
            lobby_service::handle_join_lobby(state, player_id, name).await
        }
        ClientMessage::LeaveLobby => lobby_service::handle_leave_lobby(state, player_id).await,
        ClientMessage::LobbyMessage { text } => {
            lobby_service::handle_lobby_message(state, player_id, text).await
        }
        ClientMessage::StartLobbyGame => {
            lobby_service::handle_start_lobby_game(state, player_id).await
        }
        ClientMessage::SubmitLobbyAnswer { option_index } => {
            lobby_service::handle_submit_lobby_answer(state, player_id, option_index).await
        }
        ClientMessage::LobbyNextQuestion => {
            lobby_service::handle_lobby_next_question(state, player_id).await
        }
        ClientMessage::Unknown => Err(ServiceError::InvalidInput(
            "unrecognized message type".into(),
        )),
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
