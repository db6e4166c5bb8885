//! Service helpers that expose read-only public projections of live state.

use uuid::Uuid;

use crate::{
    dto::{
        game::RoomSnapshot,
        public::{
            GameSummary, GamesResponse, LeaderboardEntryDto, LeaderboardResponse,
            PlayerRankResponse, RoomSummary, RoomsResponse,
        },
        validation::validate_room_code,
    },
    error::ServiceError,
    state::SharedState,
};

/// Return a reduced listing of every active room.
pub async fn list_rooms(state: &SharedState) -> RoomsResponse {
    let zone = state.rooms.lock().await;
    let mut rooms: Vec<RoomSummary> = zone.directory.rooms().map(Into::into).collect();
    drop(zone);
    rooms.sort_by_key(|room| room.created_at_ms);
    RoomsResponse { rooms }
}

/// Return the full snapshot of one room.
pub async fn get_room(state: &SharedState, code: &str) -> Result<RoomSnapshot, ServiceError> {
    validate_room_code(code).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let zone = state.rooms.lock().await;
    zone.directory
        .room(code)
        .map(RoomSnapshot::from)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))
}

/// Return every question set the leaderboard has seen.
pub async fn list_games(state: &SharedState) -> GamesResponse {
    let board = state.leaderboard.lock().await;
    let mut games: Vec<GameSummary> = board
        .game_ids()
        .iter()
        .filter_map(|id| board.definition(id).map(Into::into))
        .collect();
    drop(board);
    games.sort_by(|a, b| a.first_seen_ms.cmp(&b.first_seen_ms));
    GamesResponse { games }
}

/// Return the ranked entries of one question-set identity.
pub async fn get_leaderboard(
    state: &SharedState,
    game_id: &str,
    limit: usize,
) -> Result<LeaderboardResponse, ServiceError> {
    let board = state.leaderboard.lock().await;
    if board.definition(game_id).is_none() {
        return Err(ServiceError::NotFound(format!(
            "game `{game_id}` is unknown to the leaderboard"
        )));
    }
    let entries = board
        .leaderboard(game_id, limit)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| LeaderboardEntryDto::ranked(index + 1, entry))
        .collect();
    Ok(LeaderboardResponse {
        game_id: game_id.to_string(),
        entries,
    })
}

/// Return the ranked entries for the question set this server is configured
/// to play.
///
/// Unlike [`get_leaderboard`], an unseen set is not an error here: the set
/// exists by configuration, it just has no recorded games yet.
pub async fn get_current_leaderboard(state: &SharedState, limit: usize) -> LeaderboardResponse {
    let game_id = crate::state::leaderboard::game_id(&state.questions);
    let board = state.leaderboard.lock().await;
    let entries = board
        .leaderboard(&game_id, limit)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| LeaderboardEntryDto::ranked(index + 1, entry))
        .collect();
    LeaderboardResponse { game_id, entries }
}

/// Return a player's standing within one leaderboard group.
pub async fn get_player_rank(
    state: &SharedState,
    game_id: &str,
    player_id: Uuid,
) -> Result<PlayerRankResponse, ServiceError> {
    let board = state.leaderboard.lock().await;
    let rank = board.player_rank(game_id, player_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "player `{player_id}` has no entry for game `{game_id}`"
        ))
    })?;
    let best_score = board.player_best_score(game_id, player_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "player `{player_id}` has no entry for game `{game_id}`"
        ))
    })?;
    Ok(PlayerRankResponse {
        game_id: game_id.to_string(),
        player_id,
        rank,
        best_score,
    })
}

/// Wipe the global leaderboard and schedule a flush of the empty state.
pub async fn reset_leaderboard(state: &SharedState) {
    let mut board = state.leaderboard.lock().await;
    board.reset();
    drop(board);
    state.mark_leaderboard_dirty();
    tracing::info!("leaderboard reset");
}
