use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::leaderboard::{GameDefinition, LeaderboardEntry};

/// One leaderboard score as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntryEntity {
    /// Stable identifier of the scoring player.
    pub player_id: Uuid,
    /// Display name at the time the game finished.
    pub player_name: String,
    /// Final score for the game.
    pub score: u32,
    /// Code of the room the game ran in.
    pub room_code: String,
    /// Submission timestamp (milliseconds since the Unix epoch).
    pub timestamp_ms: u64,
    /// Game duration (milliseconds).
    pub duration_ms: u64,
}

/// Identity record of a question set as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameDefinitionEntity {
    /// Content hash of the question set.
    pub game_id: String,
    /// Ids of the questions, in play order.
    pub question_ids: Vec<String>,
    /// Number of questions in the set.
    pub question_count: usize,
    /// First time this set was seen (milliseconds since the Unix epoch).
    pub first_seen_ms: u64,
}

/// Whole persisted leaderboard: entry groups plus the definitions they key on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedLeaderboard {
    /// Score entries grouped by game identifier.
    pub entries: HashMap<String, Vec<LeaderboardEntryEntity>>,
    /// Question set identity records keyed by game identifier.
    pub definitions: HashMap<String, GameDefinitionEntity>,
}

impl From<LeaderboardEntry> for LeaderboardEntryEntity {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            player_id: entry.player_id,
            player_name: entry.player_name,
            score: entry.score,
            room_code: entry.room_code,
            timestamp_ms: entry.timestamp_ms,
            duration_ms: entry.duration_ms,
        }
    }
}

impl From<LeaderboardEntryEntity> for LeaderboardEntry {
    fn from(entity: LeaderboardEntryEntity) -> Self {
        Self {
            player_id: entity.player_id,
            player_name: entity.player_name,
            score: entity.score,
            room_code: entity.room_code,
            timestamp_ms: entity.timestamp_ms,
            duration_ms: entity.duration_ms,
        }
    }
}

impl From<GameDefinition> for GameDefinitionEntity {
    fn from(definition: GameDefinition) -> Self {
        Self {
            game_id: definition.game_id,
            question_ids: definition.question_ids,
            question_count: definition.question_count,
            first_seen_ms: definition.first_seen_ms,
        }
    }
}

impl From<GameDefinitionEntity> for GameDefinition {
    fn from(entity: GameDefinitionEntity) -> Self {
        Self {
            game_id: entity.game_id,
            question_ids: entity.question_ids,
            question_count: entity.question_count,
            first_seen_ms: entity.first_seen_ms,
        }
    }
}

impl PersistedLeaderboard {
    /// Capture the state of an in-memory leaderboard for writing.
    pub fn snapshot(board: &crate::state::GlobalLeaderboard) -> Self {
        let (entries, definitions) = board.snapshot();
        Self {
            entries: entries
                .into_iter()
                .map(|(id, group)| (id, group.into_iter().map(Into::into).collect()))
                .collect(),
            definitions: definitions
                .into_iter()
                .map(|(id, definition)| (id, definition.into()))
                .collect(),
        }
    }

    /// Rebuild an in-memory leaderboard from this document.
    pub fn into_leaderboard(self, top_n: usize) -> crate::state::GlobalLeaderboard {
        let entries = self
            .entries
            .into_iter()
            .map(|(id, group)| (id, group.into_iter().map(Into::into).collect()))
            .collect();
        let definitions = self
            .definitions
            .into_iter()
            .map(|(id, definition)| (id, definition.into()))
            .collect();
        crate::state::GlobalLeaderboard::restore(entries, definitions, top_n)
    }
}
