/// Game, room, and lobby payloads shared by the WebSocket and HTTP surfaces.
pub mod game;
/// Health check payloads.
pub mod health;
/// Read-only HTTP response payloads.
pub mod public;
/// Validation helpers for client-supplied fields.
pub mod validation;
/// WebSocket message envelopes.
pub mod ws;
