use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::game::RoomPhaseDto;
use crate::state::game::Room;
use crate::state::leaderboard::{GameDefinition, LeaderboardEntry};

/// Reduced room listing entry; never exposes member identities.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Invite code of the room.
    pub code: String,
    /// Number of current members.
    pub player_count: usize,
    /// Maximum number of members allowed.
    pub max_players: usize,
    /// Current lifecycle phase.
    pub phase: RoomPhaseDto,
    /// Creation timestamp (milliseconds since the Unix epoch).
    pub created_at_ms: u64,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            player_count: room.players.len(),
            max_players: room.max_players,
            phase: room.phase.into(),
            created_at_ms: room.created_at_ms,
        }
    }
}

/// Response payload listing the currently active rooms.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomSummary>,
}

/// One ranked leaderboard line.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntryDto {
    /// Rank within the listing, starting at 1.
    pub rank: usize,
    /// Identity of the scoring player.
    pub player_id: Uuid,
    /// Display name at the time the game finished.
    pub player_name: String,
    /// Final score.
    pub score: u32,
    /// Code of the room the game ran in.
    pub room_code: String,
    /// Submission timestamp (milliseconds since the Unix epoch).
    pub timestamp_ms: u64,
}

impl LeaderboardEntryDto {
    /// Annotate a stored entry with its position in the listing.
    pub fn ranked(rank: usize, entry: LeaderboardEntry) -> Self {
        Self {
            rank,
            player_id: entry.player_id,
            player_name: entry.player_name,
            score: entry.score,
            room_code: entry.room_code,
            timestamp_ms: entry.timestamp_ms,
        }
    }
}

/// Identity record of a question set known to the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameSummary {
    /// Content hash of the question set.
    pub game_id: String,
    /// Number of questions in the set.
    pub question_count: usize,
    /// First time this set was seen (milliseconds since the Unix epoch).
    pub first_seen_ms: u64,
}

impl From<&GameDefinition> for GameSummary {
    fn from(definition: &GameDefinition) -> Self {
        Self {
            game_id: definition.game_id.clone(),
            question_count: definition.question_count,
            first_seen_ms: definition.first_seen_ms,
        }
    }
}

/// Response payload listing every question set the leaderboard knows.
#[derive(Debug, Serialize, ToSchema)]
pub struct GamesResponse {
    pub games: Vec<GameSummary>,
}

/// Ranked entries for one question-set identity.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub game_id: String,
    pub entries: Vec<LeaderboardEntryDto>,
}

/// A player's standing within one leaderboard group.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerRankResponse {
    pub game_id: String,
    pub player_id: Uuid,
    /// Rank among distinct players, starting at 1.
    pub rank: usize,
    /// The player's best recorded score in this group.
    pub best_score: u32,
}
