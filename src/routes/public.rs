use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    dto::{
        game::RoomSnapshot,
        public::{GamesResponse, LeaderboardResponse, PlayerRankResponse, RoomsResponse},
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Default number of leaderboard entries returned when no limit is supplied.
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Public read-only endpoints exposing rooms and the global leaderboard.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/rooms", get(list_rooms))
        .route("/public/rooms/{code}", get(get_room))
        .route("/public/leaderboard", get(list_games))
        .route("/public/leaderboard/current", get(get_current_leaderboard))
        .route("/public/leaderboard/{game_id}", get(get_leaderboard))
        .route(
            "/public/leaderboard/{game_id}/rank/{player_id}",
            get(get_player_rank),
        )
}

#[utoipa::path(
    get,
    path = "/public/rooms",
    tag = "public",
    responses((status = 200, description = "Active rooms", body = RoomsResponse))
)]
/// Return a reduced listing of every active room.
pub async fn list_rooms(State(state): State<SharedState>) -> Json<RoomsResponse> {
    Json(public_service::list_rooms(&state).await)
}

#[utoipa::path(
    get,
    path = "/public/rooms/{code}",
    tag = "public",
    params(("code" = String, Path, description = "Room invite code")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomSnapshot),
        (status = 404, description = "No room with this code")
    )
)]
/// Return the full snapshot of one room.
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let payload = public_service::get_room(&state, &code).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    responses((status = 200, description = "Known question sets", body = GamesResponse))
)]
/// Return every question set the leaderboard has seen.
pub async fn list_games(State(state): State<SharedState>) -> Json<GamesResponse> {
    Json(public_service::list_games(&state).await)
}

#[derive(Debug, Deserialize, IntoParams)]
/// Query parameters accepted by the leaderboard listing.
pub struct LeaderboardQuery {
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/public/leaderboard/current",
    tag = "public",
    params(LeaderboardQuery),
    responses((status = 200, description = "Ranked entries for the configured question set", body = LeaderboardResponse))
)]
/// Return the ranked entries for the question set this server plays.
pub async fn get_current_leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Json<LeaderboardResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Json(public_service::get_current_leaderboard(&state, limit).await)
}

#[utoipa::path(
    get,
    path = "/public/leaderboard/{game_id}",
    tag = "public",
    params(
        ("game_id" = String, Path, description = "Question set identifier"),
        LeaderboardQuery,
    ),
    responses(
        (status = 200, description = "Ranked entries", body = LeaderboardResponse),
        (status = 404, description = "Unknown question set")
    )
)]
/// Return the ranked entries of one question-set identity.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
    Path(game_id): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    let payload = public_service::get_leaderboard(&state, &game_id, limit).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard/{game_id}/rank/{player_id}",
    tag = "public",
    params(
        ("game_id" = String, Path, description = "Question set identifier"),
        ("player_id" = Uuid, Path, description = "Player identity"),
    ),
    responses(
        (status = 200, description = "Player standing", body = PlayerRankResponse),
        (status = 404, description = "Player has no entry for this question set")
    )
)]
/// Return a player's standing within one leaderboard group.
pub async fn get_player_rank(
    State(state): State<SharedState>,
    Path((game_id, player_id)): Path<(String, Uuid)>,
) -> Result<Json<PlayerRankResponse>, AppError> {
    let payload = public_service::get_player_rank(&state, &game_id, player_id).await?;
    Ok(Json(payload))
}
