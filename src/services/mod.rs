/// OpenAPI documentation generation.
pub mod documentation;
/// Server event serialization and fan-out to client sockets.
pub mod events;
/// Health check service.
pub mod health_service;
/// Global lobby presence, chat, and the shared countdown game.
pub mod lobby_service;
/// Debounced leaderboard persistence worker.
pub mod persistence;
/// Public service for read-only room and leaderboard information.
pub mod public_service;
/// Coordination of room-scoped games.
pub mod session_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;
