use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Rally Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::websocket::ws_handler,
        crate::routes::public::list_rooms,
        crate::routes::public::get_room,
        crate::routes::public::list_games,
        crate::routes::public::get_current_leaderboard,
        crate::routes::public::get_leaderboard,
        crate::routes::public::get_player_rank,
        crate::routes::admin::reset_leaderboard,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::game::QuestionDto,
            crate::dto::game::RoomSnapshot,
            crate::dto::game::PlayerSummary,
            crate::dto::game::RoomPhaseDto,
            crate::dto::game::ScoreEntry,
            crate::dto::game::FinalResultsDto,
            crate::dto::game::LobbyPlayerSummary,
            crate::dto::game::ChatMessageDto,
            crate::dto::public::RoomsResponse,
            crate::dto::public::RoomSummary,
            crate::dto::public::GamesResponse,
            crate::dto::public::GameSummary,
            crate::dto::public::LeaderboardResponse,
            crate::dto::public::LeaderboardEntryDto,
            crate::dto::public::PlayerRankResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "public", description = "Read-only room and leaderboard projections"),
        (name = "admin", description = "Operational endpoints"),
        (name = "game", description = "WebSocket operations for players"),
    )
)]
pub struct ApiDoc;
