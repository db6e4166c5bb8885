//! Domain types shared by the room directory, the game engine, and the lobby.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Current wall-clock time as milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    (nanos / 1_000_000).max(0) as u64
}

/// A single trivia question, answer key included.
///
/// This shape is what the question set document on disk contains; it must
/// never cross the wire as-is before the round resolves. Clients receive
/// [`crate::state::engine::ClientQuestion`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier of the question within its set.
    pub id: String,
    /// The question text presented to players.
    pub text: String,
    /// Optional URL of an audio asset played alongside the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option_index: usize,
}

/// Player tracked inside a room; the engine keeps its own deep copy during play.
#[derive(Debug, Clone)]
pub struct Player {
    /// Server-assigned identity, stable across reconnects when the client resupplies it.
    pub id: Uuid,
    /// Display name chosen by the player.
    pub name: String,
    /// Accumulated score. Mutated only by the engine during answer resolution.
    pub score: u32,
    /// Whether a live connection currently backs this player.
    pub connected: bool,
    /// Whether the player has answered the current question.
    pub has_answered: bool,
    /// Whether this player is the room's host.
    pub is_host: bool,
}

impl Player {
    /// Build a fresh, connected player with a zero score.
    pub fn new(id: Uuid, name: String, is_host: bool) -> Self {
        Self {
            id,
            name,
            score: 0,
            connected: true,
            has_answered: false,
            is_host,
        }
    }
}

/// Lifecycle phase of a room, mirrored to external consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Players can still join; no game is running.
    Waiting,
    /// A game is in progress.
    Playing,
    /// The game ran to completion.
    Finished,
}

/// An isolated, code-addressed multiplayer session container.
#[derive(Debug, Clone)]
pub struct Room {
    /// Unique invite code, generated from an unambiguous alphabet.
    pub code: String,
    /// Members keyed by player id; insertion order is join order.
    pub players: IndexMap<Uuid, Player>,
    /// Current lifecycle phase.
    pub phase: RoomPhase,
    /// Index of the question currently in play, mirrored from the engine.
    pub current_question_index: usize,
    /// Maximum number of members allowed.
    pub max_players: usize,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

impl Room {
    /// Build a new room in the waiting phase with its creator as sole host.
    pub fn new(code: String, max_players: usize, creator_id: Uuid, creator_name: String) -> Self {
        let mut players = IndexMap::new();
        players.insert(creator_id, Player::new(creator_id, creator_name, true));
        Self {
            code,
            players,
            phase: RoomPhase::Waiting,
            current_question_index: 0,
            max_players,
            created_at_ms: unix_millis(),
        }
    }

    /// Identity of the current host, if the room is non-empty.
    pub fn host_id(&self) -> Option<Uuid> {
        self.players
            .values()
            .find(|player| player.is_host)
            .map(|player| player.id)
    }

    /// Member ids in join order, used as a broadcast group.
    pub fn member_ids(&self) -> Vec<Uuid> {
        self.players.keys().copied().collect()
    }
}
