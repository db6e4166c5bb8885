//! Coordination of room-scoped games: membership changes, answer collection,
//! host-driven advancement, and end-of-game leaderboard submission.

use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        game::{FinalResultsDto, PlayerSummary, RoomSnapshot, ScoreEntry},
        validation::{validate_player_name, validate_room_code},
        ws::ServerMessage,
    },
    error::ServiceError,
    services::events,
    state::{GameEngine, RoomPhase, SharedState},
};

/// How often the housekeeping sweep runs.
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

/// Create a room with the caller as host and confirm it to them.
pub async fn handle_create_room(
    state: &SharedState,
    player_id: Uuid,
    name: String,
) -> Result<(), ServiceError> {
    validate_player_name(&name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let mut zone = state.rooms.lock().await;
    if zone.directory.room_code_of(player_id).is_some() {
        return Err(ServiceError::InvalidState(
            "player is already in a room".into(),
        ));
    }
    let room = zone.directory.create_room(player_id, name);
    let snapshot = RoomSnapshot::from(room);
    drop(zone);

    events::send_to_player(state, player_id, &ServerMessage::RoomCreated { room: snapshot });
    Ok(())
}

/// Join an existing waiting room by invite code.
pub async fn handle_join_room(
    state: &SharedState,
    player_id: Uuid,
    code: String,
    name: String,
) -> Result<(), ServiceError> {
    validate_player_name(&name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    validate_room_code(&code)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let mut zone = state.rooms.lock().await;
    if zone.directory.room_code_of(player_id).is_some() {
        return Err(ServiceError::InvalidState(
            "player is already in a room".into(),
        ));
    }
    let room = zone.directory.join_room(&code, player_id, name)?;
    let snapshot = RoomSnapshot::from(room);
    let members = room.member_ids();
    let joined = room
        .players
        .get(&player_id)
        .map(PlayerSummary::from)
        .ok_or_else(|| ServiceError::NotFound("joined player missing from room".into()))?;
    drop(zone);

    events::send_to_player(
        state,
        player_id,
        &ServerMessage::RoomJoined {
            room: snapshot,
            player_id,
        },
    );
    events::broadcast_except(
        state,
        &members,
        player_id,
        &ServerMessage::PlayerJoined { player: joined },
    );
    Ok(())
}

/// Leave the current room voluntarily.
pub async fn handle_leave_room(state: &SharedState, player_id: Uuid) -> Result<(), ServiceError> {
    remove_from_room(state, player_id).await?.ok_or_else(|| {
        ServiceError::NotFound("player is not in a room".into())
    })?;
    Ok(())
}

/// Start the room's game. Host only; the room must still be waiting.
pub async fn handle_start_game(state: &SharedState, player_id: Uuid) -> Result<(), ServiceError> {
    let mut zone = state.rooms.lock().await;
    let code = zone
        .directory
        .room_code_of(player_id)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::NotFound("player is not in a room".into()))?;
    let room = zone
        .directory
        .room_mut(&code)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))?;

    if room.host_id() != Some(player_id) {
        return Err(ServiceError::Unauthorized(
            "only the host can start the game".into(),
        ));
    }
    if room.phase != RoomPhase::Waiting {
        return Err(ServiceError::InvalidState(
            "the room's game already started".into(),
        ));
    }

    let mut engine = GameEngine::new(state.questions.clone(), &room.players);
    let question = engine.start()?;
    room.phase = RoomPhase::Playing;
    room.current_question_index = 0;
    let members = room.member_ids();
    zone.engines.insert(code.clone(), engine);
    drop(zone);

    info!(%code, host = %player_id, "room game started");
    events::broadcast(
        state,
        &members,
        &ServerMessage::GameStarted {
            question: question.into(),
        },
    );
    Ok(())
}

/// Record the caller's answer to the current question.
///
/// The caller gets a private verdict; everyone else only learns that the
/// caller has locked in. When the last connected member answers, the round
/// resolves for the whole room.
pub async fn handle_submit_answer(
    state: &SharedState,
    player_id: Uuid,
    option_index: usize,
) -> Result<(), ServiceError> {
    let mut zone = state.rooms.lock().await;
    let code = zone
        .directory
        .room_code_of(player_id)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::NotFound("player is not in a room".into()))?;
    let members = zone
        .directory
        .room(&code)
        .map(|room| room.member_ids())
        .unwrap_or_default();
    let engine = zone
        .engines
        .get_mut(&code)
        .ok_or_else(|| ServiceError::InvalidState("no game is running in this room".into()))?;

    let outcome = engine.submit_answer(player_id, option_index)?;
    let round = if engine.all_connected_answered() {
        round_results(engine)
    } else {
        None
    };
    drop(zone);

    events::send_to_player(
        state,
        player_id,
        &ServerMessage::AnswerAccepted {
            is_correct: outcome.is_correct,
            points_awarded: outcome.points_awarded,
        },
    );
    events::broadcast_except(
        state,
        &members,
        player_id,
        &ServerMessage::PlayerAnswered { player_id },
    );
    if let Some(results) = round {
        events::broadcast(state, &members, &results);
    }
    Ok(())
}

/// Advance the room's game to the next question, or finish it. Host only.
pub async fn handle_next_question(
    state: &SharedState,
    player_id: Uuid,
) -> Result<(), ServiceError> {
    let mut zone = state.rooms.lock().await;
    let code = zone
        .directory
        .room_code_of(player_id)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::NotFound("player is not in a room".into()))?;

    let room = zone
        .directory
        .room_mut(&code)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))?;
    if room.host_id() != Some(player_id) {
        return Err(ServiceError::Unauthorized(
            "only the host can advance the game".into(),
        ));
    }
    let members = room.member_ids();

    let engine = zone
        .engines
        .get_mut(&code)
        .ok_or_else(|| ServiceError::InvalidState("no game is running in this room".into()))?;
    let advance = engine.next_question()?;

    if advance.game_finished {
        let results = engine.end_game()?;
        let questions = engine.questions().to_vec();
        let engine_index = engine.current_index();
        zone.engines.remove(&code);
        if let Some(room) = zone.directory.room_mut(&code) {
            room.phase = RoomPhase::Finished;
            room.current_question_index = engine_index;
            for (id, member) in room.players.iter_mut() {
                if let Some(line) = results.final_scores.iter().find(|line| line.player_id == *id) {
                    member.score = line.score;
                }
            }
        }

        // Lock order: rooms before leaderboard.
        let mut board = state.leaderboard.lock().await;
        board.submit_results(&questions, &code, &results.final_scores, results.duration_ms);
        drop(board);
        drop(zone);
        state.mark_leaderboard_dirty();

        info!(%code, "room game finished");
        events::broadcast(
            state,
            &members,
            &ServerMessage::GameEnded {
                results: FinalResultsDto::from(results),
            },
        );
        return Ok(());
    }

    let question = advance
        .question
        .ok_or_else(|| ServiceError::InvalidState("advance produced no question".into()))?;
    if let Some(room) = zone.directory.room_mut(&code) {
        room.current_question_index = question.number - 1;
    }
    drop(zone);

    events::broadcast(
        state,
        &members,
        &ServerMessage::NextQuestion {
            question: question.into(),
        },
    );
    Ok(())
}

/// React to a dropped connection: the player leaves their room, and a game
/// in play keeps their score under a disconnected flag.
pub async fn handle_disconnect(state: &SharedState, player_id: Uuid) {
    match remove_from_room(state, player_id).await {
        Ok(Some(code)) => debug!(%code, %player_id, "disconnected player removed from room"),
        Ok(None) => {}
        Err(err) => warn!(%player_id, error = %err, "room cleanup after disconnect failed"),
    }
}

/// Shared removal path for voluntary leaves and disconnects.
///
/// Returns the code of the room left, or `None` when the player was not in
/// one. Handles host promotion, engine bookkeeping, and the barrier
/// re-evaluation a departure can trigger.
async fn remove_from_room(
    state: &SharedState,
    player_id: Uuid,
) -> Result<Option<String>, ServiceError> {
    let mut zone = state.rooms.lock().await;
    let Some(code) = zone.directory.room_code_of(player_id).map(str::to_string) else {
        return Ok(None);
    };

    let outcome = zone.directory.leave_room(&code, player_id)?;

    let mut round = None;
    if let Some(engine) = zone.engines.get_mut(&code) {
        let was_complete = engine.all_connected_answered();
        engine.mark_disconnected(player_id);
        if !was_complete && engine.all_connected_answered() {
            round = round_results(engine);
        }
    }
    if outcome.room_deleted {
        zone.engines.remove(&code);
    }

    let members = zone
        .directory
        .room(&code)
        .map(|room| room.member_ids())
        .unwrap_or_default();
    drop(zone);

    events::broadcast(
        state,
        &members,
        &ServerMessage::PlayerLeft {
            player_id,
            new_host: outcome.new_host,
        },
    );
    if let Some(results) = round {
        events::broadcast(state, &members, &results);
    }
    Ok(Some(code))
}

/// Build the round resolution event from the engine's current question.
fn round_results(engine: &GameEngine) -> Option<ServerMessage> {
    let correct_option_index = engine.current_correct_index()?;
    let scores: Vec<ScoreEntry> = engine.leaderboard().into_iter().map(Into::into).collect();
    Some(ServerMessage::RoundResults {
        scores,
        correct_option_index,
    })
}

/// Periodic sweep deleting rooms that emptied without a synchronous delete.
pub async fn run_room_housekeeping(state: SharedState) {
    let mut ticker = interval(HOUSEKEEPING_INTERVAL);
    loop {
        ticker.tick().await;
        let mut zone = state.rooms.lock().await;
        let removed = zone.directory.cleanup_empty_rooms();
        if removed > 0 {
            let live: Vec<String> = zone.directory.rooms().map(|room| room.code.clone()).collect();
            zone.engines.retain(|code, _| live.contains(code));
            info!(removed, "housekeeping removed empty rooms");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, GlobalLeaderboard, game::Question},
    };

    fn questions() -> Vec<Question> {
        vec![
            Question {
                id: "q1".into(),
                text: "2 + 2?".into(),
                audio: None,
                options: vec!["3".into(), "4".into()],
                correct_option_index: 1,
            },
            Question {
                id: "q2".into(),
                text: "3 + 3?".into(),
                audio: None,
                options: vec!["6".into(), "7".into()],
                correct_option_index: 0,
            },
        ]
    }

    fn test_state() -> SharedState {
        AppState::new(
            AppConfig::default(),
            questions(),
            GlobalLeaderboard::new(100),
        )
    }

    async fn room_code(state: &SharedState, player_id: Uuid) -> String {
        let zone = state.rooms.lock().await;
        zone.directory.room_code_of(player_id).unwrap().to_string()
    }

    #[tokio::test]
    async fn full_game_flow_reaches_the_leaderboard() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        let code = room_code(&state, host).await;
        handle_join_room(&state, guest, code.clone(), "guest".into())
            .await
            .unwrap();

        handle_start_game(&state, host).await.unwrap();
        {
            let zone = state.rooms.lock().await;
            assert!(zone.engines.contains_key(&code));
            assert_eq!(
                zone.directory.room(&code).unwrap().phase,
                RoomPhase::Playing
            );
        }

        // Round 1: host correct, guest wrong.
        handle_submit_answer(&state, host, 1).await.unwrap();
        handle_submit_answer(&state, guest, 0).await.unwrap();
        handle_next_question(&state, host).await.unwrap();

        // Round 2: both correct, guest first.
        handle_submit_answer(&state, guest, 0).await.unwrap();
        handle_submit_answer(&state, host, 0).await.unwrap();
        handle_next_question(&state, host).await.unwrap();

        let zone = state.rooms.lock().await;
        assert!(!zone.engines.contains_key(&code));
        let room = zone.directory.room(&code).unwrap();
        assert_eq!(room.phase, RoomPhase::Finished);
        assert_eq!(room.players[&host].score, 250);
        assert_eq!(room.players[&guest].score, 150);
        drop(zone);

        let board = state.leaderboard.lock().await;
        let id = crate::state::leaderboard::game_id(&questions());
        let entries = board.leaderboard(&id, 10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].score, 250);
        assert_eq!(entries[0].room_code, code);
    }

    #[tokio::test]
    async fn only_the_host_can_start_and_advance() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        let code = room_code(&state, host).await;
        handle_join_room(&state, guest, code, "guest".into())
            .await
            .unwrap();

        assert!(matches!(
            handle_start_game(&state, guest).await,
            Err(ServiceError::Unauthorized(_))
        ));
        handle_start_game(&state, host).await.unwrap();
        assert!(matches!(
            handle_next_question(&state, guest).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn host_departure_mid_game_promotes_and_keeps_the_game_running() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let third = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        let code = room_code(&state, host).await;
        handle_join_room(&state, guest, code.clone(), "guest".into())
            .await
            .unwrap();
        handle_join_room(&state, third, code.clone(), "third".into())
            .await
            .unwrap();
        handle_start_game(&state, host).await.unwrap();

        handle_disconnect(&state, host).await;

        let zone = state.rooms.lock().await;
        let room = zone.directory.room(&code).unwrap();
        assert_eq!(room.host_id(), Some(guest));
        let engine = zone.engines.get(&code).unwrap();
        assert!(engine.has_player(host), "departed player keeps their score");
        assert!(!engine.players()[&host].connected);
        drop(zone);

        // The promoted host can advance.
        handle_submit_answer(&state, guest, 1).await.unwrap();
        handle_submit_answer(&state, third, 1).await.unwrap();
        handle_next_question(&state, guest).await.unwrap();
    }

    #[tokio::test]
    async fn departure_of_the_last_holdout_resolves_the_round() {
        let state = test_state();
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        let code = room_code(&state, host).await;
        handle_join_room(&state, guest, code.clone(), "guest".into())
            .await
            .unwrap();
        handle_start_game(&state, host).await.unwrap();

        handle_submit_answer(&state, host, 1).await.unwrap();
        {
            let zone = state.rooms.lock().await;
            assert!(!zone.engines.get(&code).unwrap().all_connected_answered());
        }

        handle_disconnect(&state, guest).await;
        let zone = state.rooms.lock().await;
        assert!(zone.engines.get(&code).unwrap().all_connected_answered());
    }

    #[tokio::test]
    async fn last_departure_deletes_room_and_engine() {
        let state = test_state();
        let host = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        let code = room_code(&state, host).await;

        handle_leave_room(&state, host).await.unwrap();
        let zone = state.rooms.lock().await;
        assert!(zone.directory.room(&code).is_none());
        assert!(!zone.engines.contains_key(&code));
    }

    #[tokio::test]
    async fn joining_two_rooms_at_once_is_rejected() {
        let state = test_state();
        let host = Uuid::new_v4();
        let other = Uuid::new_v4();

        handle_create_room(&state, host, "host".into()).await.unwrap();
        handle_create_room(&state, other, "other".into()).await.unwrap();
        let code = room_code(&state, other).await;

        assert!(matches!(
            handle_join_room(&state, host, code, "host".into()).await,
            Err(ServiceError::InvalidState(_))
        ));
    }
}
