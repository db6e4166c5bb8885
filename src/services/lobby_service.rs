//! Global lobby coordination: presence, chat, and the shared countdown game.

use std::time::Duration;

use tokio::{sync::watch, time::sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        game::{ChatMessageDto, FinalResultsDto, LobbyPlayerSummary, ScoreEntry},
        validation::{validate_chat_message, validate_player_name},
        ws::ServerMessage,
    },
    error::ServiceError,
    services::events,
    state::{
        GameEngine, SharedState,
        lobby::{LobbyError, LobbyGame, LobbyGameStatus},
    },
};

/// Room code the shared lobby game reports to the leaderboard. Uses
/// characters outside the invite-code alphabet so it can never collide.
pub const LOBBY_ROOM_CODE: &str = "LOBBY-0";

/// Enter the global lobby.
pub async fn handle_join_lobby(
    state: &SharedState,
    player_id: Uuid,
    name: String,
) -> Result<(), ServiceError> {
    validate_player_name(&name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let mut lobby = state.lobby.lock().await;
    lobby.join(player_id, name.clone())?;
    let announcement = ChatMessageDto::from(lobby.push_system_message(format!("{name} joined the lobby")));
    let players: Vec<LobbyPlayerSummary> = lobby.players().map(Into::into).collect();
    let chat_history: Vec<ChatMessageDto> = lobby.chat_history().map(Into::into).collect();
    let members = lobby.member_ids();
    drop(lobby);

    events::send_to_player(
        state,
        player_id,
        &ServerMessage::LobbyJoined {
            player_id,
            players: players.clone(),
        },
    );
    events::send_to_player(
        state,
        player_id,
        &ServerMessage::LobbyChatHistory {
            messages: chat_history,
        },
    );
    events::broadcast_except(
        state,
        &members,
        player_id,
        &ServerMessage::LobbyPlayersUpdated { players },
    );
    events::broadcast_except(
        state,
        &members,
        player_id,
        &ServerMessage::LobbyChatMessage { message: announcement },
    );
    Ok(())
}

/// Leave the global lobby voluntarily.
pub async fn handle_leave_lobby(state: &SharedState, player_id: Uuid) -> Result<(), ServiceError> {
    if !remove_from_lobby(state, player_id).await? {
        return Err(LobbyError::NotInLobby.into());
    }
    Ok(())
}

/// Post a chat message to the lobby.
pub async fn handle_lobby_message(
    state: &SharedState,
    player_id: Uuid,
    text: String,
) -> Result<(), ServiceError> {
    validate_chat_message(&text)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let mut lobby = state.lobby.lock().await;
    let author_name = lobby
        .player_name(player_id)
        .map(str::to_string)
        .ok_or(LobbyError::NotInLobby)?;
    let message = ChatMessageDto::from(lobby.push_user_message(player_id, author_name, text));
    let members = lobby.member_ids();
    drop(lobby);

    events::broadcast(state, &members, &ServerMessage::LobbyChatMessage { message });
    Ok(())
}

/// Kick off the shared lobby game countdown.
///
/// The caller becomes the game's initiator; the roster is the set of
/// connected lobby members captured at this instant.
pub async fn handle_start_lobby_game(
    state: &SharedState,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let mut lobby = state.lobby.lock().await;
    if !lobby.contains(player_id) {
        return Err(LobbyError::NotInLobby.into());
    }
    if lobby.game.is_some() {
        return Err(LobbyError::GameAlreadyRunning.into());
    }
    if !lobby.can_start_game() {
        return Err(LobbyError::NotEnoughPlayers.into());
    }

    let roster = lobby.game_roster(player_id);
    let participants: Vec<Uuid> = roster.keys().copied().collect();
    let engine = GameEngine::new(state.questions.clone(), &roster);
    let (cancel_tx, cancel_rx) = watch::channel(false);
    lobby.game = Some(LobbyGame {
        engine,
        status: LobbyGameStatus::Starting,
        initiator: player_id,
        participants,
        countdown_cancel: Some(cancel_tx),
    });
    drop(lobby);

    info!(initiator = %player_id, "lobby game countdown started");
    tokio::spawn(run_countdown(state.clone(), cancel_rx));
    Ok(())
}

/// Record the caller's answer to the current lobby question.
pub async fn handle_submit_lobby_answer(
    state: &SharedState,
    player_id: Uuid,
    option_index: usize,
) -> Result<(), ServiceError> {
    let mut lobby = state.lobby.lock().await;
    let members = lobby.member_ids();
    let game = lobby.game.as_mut().ok_or(LobbyError::NoGame)?;
    if game.status != LobbyGameStatus::Playing {
        return Err(ServiceError::InvalidState(
            "the lobby game has not started yet".into(),
        ));
    }

    let outcome = game.engine.submit_answer(player_id, option_index)?;
    let round = if game.engine.all_connected_answered() {
        lobby_round_results(&game.engine)
    } else {
        None
    };
    drop(lobby);

    events::send_to_player(
        state,
        player_id,
        &ServerMessage::LobbyAnswerAccepted {
            is_correct: outcome.is_correct,
            points_awarded: outcome.points_awarded,
        },
    );
    events::broadcast_except(
        state,
        &members,
        player_id,
        &ServerMessage::LobbyPlayerAnswered { player_id },
    );
    if let Some(results) = round {
        events::broadcast(state, &members, &results);
    }
    Ok(())
}

/// Advance the lobby game to the next question, or finish it. Initiator only.
pub async fn handle_lobby_next_question(
    state: &SharedState,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let mut lobby = state.lobby.lock().await;
    let members = lobby.member_ids();
    let game = lobby.game.as_mut().ok_or(LobbyError::NoGame)?;
    if game.initiator != player_id {
        return Err(ServiceError::Unauthorized(
            "only the initiator can advance the lobby game".into(),
        ));
    }
    if game.status != LobbyGameStatus::Playing {
        return Err(ServiceError::InvalidState(
            "the lobby game has not started yet".into(),
        ));
    }

    let advance = game.engine.next_question()?;
    if advance.game_finished {
        let results = game.engine.end_game()?;
        let questions = game.engine.questions().to_vec();
        lobby.reset_game();

        // Lock order: lobby before leaderboard.
        let mut board = state.leaderboard.lock().await;
        board.submit_results(
            &questions,
            LOBBY_ROOM_CODE,
            &results.final_scores,
            results.duration_ms,
        );
        drop(board);
        drop(lobby);
        state.mark_leaderboard_dirty();

        info!("lobby game finished");
        events::broadcast(
            state,
            &members,
            &ServerMessage::LobbyGameEnded {
                results: FinalResultsDto::from(results),
            },
        );
        return Ok(());
    }

    let question = advance
        .question
        .ok_or_else(|| ServiceError::InvalidState("advance produced no question".into()))?;
    drop(lobby);

    events::broadcast(
        state,
        &members,
        &ServerMessage::LobbyNextQuestion {
            question: question.into(),
        },
    );
    Ok(())
}

/// React to a dropped connection for the lobby side of the player's state.
pub async fn handle_disconnect(state: &SharedState, player_id: Uuid) {
    match remove_from_lobby(state, player_id).await {
        Ok(true) => debug!(%player_id, "disconnected player removed from lobby"),
        Ok(false) => {}
        Err(err) => warn!(%player_id, error = %err, "lobby cleanup after disconnect failed"),
    }
}

/// Shared removal path for voluntary leaves and disconnects.
///
/// Returns whether the player was a lobby member. A departure during the
/// countdown can cancel the pending game; one during play can resolve the
/// current round or retire a game every participant abandoned.
async fn remove_from_lobby(state: &SharedState, player_id: Uuid) -> Result<bool, ServiceError> {
    let mut lobby = state.lobby.lock().await;
    let Ok(departed) = lobby.leave(player_id) else {
        return Ok(false);
    };

    let announcement =
        ChatMessageDto::from(lobby.push_system_message(format!("{} left the lobby", departed.name)));

    let mut cancelled_reason = None;
    let mut round = None;
    if let Some(game) = lobby.game.as_mut() {
        let was_complete = game.engine.all_connected_answered();
        game.engine.mark_disconnected(player_id);
        match game.status {
            LobbyGameStatus::Starting => {
                let connected = game
                    .engine
                    .players()
                    .values()
                    .filter(|player| player.connected)
                    .count();
                if connected < 2 {
                    cancelled_reason =
                        Some("not enough players left before the game could start".to_string());
                }
            }
            LobbyGameStatus::Playing => {
                // Reveal only on the incomplete-to-complete transition; an
                // already-resolved round must not be broadcast again.
                if !was_complete
                    && game.engine.all_connected_answered()
                    && !game.engine.finished()
                {
                    round = lobby_round_results(&game.engine);
                }
            }
        }
    }
    if cancelled_reason.is_some() || lobby.game_is_stale() {
        if cancelled_reason.is_none() {
            cancelled_reason = Some("every participant left the lobby".to_string());
        }
        lobby.reset_game();
    }

    let players: Vec<LobbyPlayerSummary> = lobby.players().map(Into::into).collect();
    let members = lobby.member_ids();
    drop(lobby);

    events::broadcast(state, &members, &ServerMessage::LobbyPlayersUpdated { players });
    events::broadcast(
        state,
        &members,
        &ServerMessage::LobbyChatMessage { message: announcement },
    );
    if let Some(reason) = cancelled_reason {
        info!(%player_id, %reason, "lobby game cancelled");
        events::broadcast(state, &members, &ServerMessage::LobbyGameCancelled { reason });
    } else if let Some(results) = round {
        events::broadcast(state, &members, &results);
    }
    Ok(true)
}

/// Drive the pre-game countdown, then start the engine unless cancelled.
async fn run_countdown(state: SharedState, mut cancel_rx: watch::Receiver<bool>) {
    let seconds = state.config.lobby_countdown_secs;
    for remaining in (1..=seconds).rev() {
        let members = state.lobby.lock().await.member_ids();
        events::broadcast(
            &state,
            &members,
            &ServerMessage::LobbyGameStarting {
                seconds_remaining: remaining,
            },
        );
        tokio::select! {
            _ = sleep(Duration::from_secs(1)) => {}
            _ = cancel_rx.changed() => {
                debug!("lobby countdown cancelled");
                return;
            }
        }
    }

    let mut lobby = state.lobby.lock().await;
    let Some(game) = lobby.game.as_mut() else {
        return;
    };
    if game.status != LobbyGameStatus::Starting {
        return;
    }

    match game.engine.start() {
        Ok(question) => {
            game.status = LobbyGameStatus::Playing;
            game.countdown_cancel = None;
            let members = lobby.member_ids();
            drop(lobby);

            info!("lobby game started");
            events::broadcast(
                &state,
                &members,
                &ServerMessage::LobbyGameStarted {
                    question: question.into(),
                },
            );
        }
        Err(err) => {
            warn!(error = %err, "lobby game failed to start");
            lobby.reset_game();
            let members = lobby.member_ids();
            drop(lobby);

            events::broadcast(
                &state,
                &members,
                &ServerMessage::LobbyGameCancelled {
                    reason: "the game could not be started".to_string(),
                },
            );
        }
    }
}

/// Build the round resolution event from the engine's current question.
fn lobby_round_results(engine: &GameEngine) -> Option<ServerMessage> {
    let correct_option_index = engine.current_correct_index()?;
    let scores: Vec<ScoreEntry> = engine.leaderboard().into_iter().map(Into::into).collect();
    Some(ServerMessage::LobbyRoundResults {
        scores,
        correct_option_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, GlobalLeaderboard, game::Question},
    };

    fn questions() -> Vec<Question> {
        vec![Question {
            id: "q1".into(),
            text: "2 + 2?".into(),
            audio: None,
            options: vec!["3".into(), "4".into()],
            correct_option_index: 1,
        }]
    }

    fn test_state() -> SharedState {
        let config = AppConfig {
            lobby_countdown_secs: 0,
            ..AppConfig::default()
        };
        AppState::new(config, questions(), GlobalLeaderboard::new(100))
    }

    /// Countdown of zero seconds starts the game on the next scheduler turn.
    async fn wait_for_playing(state: &SharedState) {
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let lobby = state.lobby.lock().await;
            if matches!(
                lobby.game.as_ref().map(|game| game.status),
                Some(LobbyGameStatus::Playing)
            ) {
                return;
            }
        }
        panic!("lobby game never started");
    }

    #[tokio::test]
    async fn starting_requires_membership_and_two_players() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert!(handle_start_lobby_game(&state, alice).await.is_err());

        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        assert!(matches!(
            handle_start_lobby_game(&state, alice).await,
            Err(ServiceError::InvalidState(_))
        ));

        handle_join_lobby(&state, bob, "bob".into()).await.unwrap();
        handle_start_lobby_game(&state, alice).await.unwrap();
        assert!(matches!(
            handle_start_lobby_game(&state, bob).await,
            Err(ServiceError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn lobby_game_runs_to_completion() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        handle_join_lobby(&state, bob, "bob".into()).await.unwrap();

        handle_start_lobby_game(&state, alice).await.unwrap();
        wait_for_playing(&state).await;

        handle_submit_lobby_answer(&state, alice, 1).await.unwrap();
        handle_submit_lobby_answer(&state, bob, 0).await.unwrap();

        assert!(matches!(
            handle_lobby_next_question(&state, bob).await,
            Err(ServiceError::Unauthorized(_))
        ));
        handle_lobby_next_question(&state, alice).await.unwrap();

        let lobby = state.lobby.lock().await;
        assert!(lobby.game.is_none());
        drop(lobby);

        let board = state.leaderboard.lock().await;
        let id = crate::state::leaderboard::game_id(&questions());
        let entries = board.leaderboard(&id, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].room_code, LOBBY_ROOM_CODE);
        assert_eq!(entries[0].score, 150);
    }

    #[tokio::test]
    async fn countdown_cancels_when_players_drop_below_two() {
        let state = AppState::new(
            AppConfig {
                lobby_countdown_secs: 30,
                ..AppConfig::default()
            },
            questions(),
            GlobalLeaderboard::new(100),
        );
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        handle_join_lobby(&state, bob, "bob".into()).await.unwrap();

        handle_start_lobby_game(&state, alice).await.unwrap();
        handle_leave_lobby(&state, bob).await.unwrap();

        let lobby = state.lobby.lock().await;
        assert!(lobby.game.is_none(), "pending game must be cancelled");
    }

    #[tokio::test]
    async fn departure_after_reveal_does_not_repeat_round_results() {
        use axum::extract::ws::Message;
        use crate::state::ClientConnection;

        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        handle_join_lobby(&state, bob, "bob".into()).await.unwrap();

        handle_start_lobby_game(&state, alice).await.unwrap();
        wait_for_playing(&state).await;

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        state
            .connections
            .insert(alice, ClientConnection { player_id: alice, tx });

        handle_submit_lobby_answer(&state, alice, 1).await.unwrap();
        handle_submit_lobby_answer(&state, bob, 0).await.unwrap();
        handle_leave_lobby(&state, bob).await.unwrap();

        let mut reveals = 0;
        while let Ok(Message::Text(text)) = rx.try_recv() {
            if text.contains("lobby-round-results") {
                reveals += 1;
            }
        }
        assert_eq!(reveals, 1, "a resolved round must be revealed once");
    }

    #[tokio::test]
    async fn chat_requires_membership_and_fans_out() {
        let state = test_state();
        let alice = Uuid::new_v4();

        assert!(handle_lobby_message(&state, alice, "hi".into()).await.is_err());

        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        handle_lobby_message(&state, alice, "hi".into()).await.unwrap();
        assert!(handle_lobby_message(&state, alice, "   ".into()).await.is_err());

        let lobby = state.lobby.lock().await;
        let texts: Vec<&str> = lobby.chat_history().map(|m| m.text.as_str()).collect();
        // Join announcement plus the user message.
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], "hi");
    }

    #[tokio::test]
    async fn stale_game_is_retired_when_all_participants_leave() {
        let state = test_state();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let carol = Uuid::new_v4();
        handle_join_lobby(&state, alice, "alice".into()).await.unwrap();
        handle_join_lobby(&state, bob, "bob".into()).await.unwrap();

        handle_start_lobby_game(&state, alice).await.unwrap();
        wait_for_playing(&state).await;

        // A latecomer is a member but not a participant.
        handle_join_lobby(&state, carol, "carol".into()).await.unwrap();

        handle_leave_lobby(&state, alice).await.unwrap();
        {
            let lobby = state.lobby.lock().await;
            assert!(lobby.game.is_some(), "one participant still present");
        }

        handle_leave_lobby(&state, bob).await.unwrap();
        let lobby = state.lobby.lock().await;
        assert!(lobby.game.is_none(), "abandoned game must be retired");
    }
}
