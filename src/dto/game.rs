use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    engine::{ClientQuestion, FinalResults, ScoreLine},
    game::{Player, Room, RoomPhase},
    lobby::{ChatKind, ChatMessage, LobbyPlayer},
};

/// Question payload as transmitted to clients. Never carries the answer key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuestionDto {
    /// Stable identifier of the question.
    pub id: String,
    /// The question text.
    pub text: String,
    /// Optional URL of an audio asset played alongside the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// 1-based position of this question within the set.
    pub number: usize,
    /// Total number of questions in the set.
    pub total: usize,
}

impl From<ClientQuestion> for QuestionDto {
    fn from(question: ClientQuestion) -> Self {
        Self {
            id: question.id,
            text: question.text,
            audio: question.audio,
            options: question.options,
            number: question.number,
            total: question.total,
        }
    }
}

/// Room lifecycle phase as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RoomPhaseDto {
    /// Players can still join.
    Waiting,
    /// A game is in progress.
    Playing,
    /// The game ran to completion.
    Finished,
}

impl From<RoomPhase> for RoomPhaseDto {
    fn from(phase: RoomPhase) -> Self {
        match phase {
            RoomPhase::Waiting => Self::Waiting,
            RoomPhase::Playing => Self::Playing,
            RoomPhase::Finished => Self::Finished,
        }
    }
}

/// Room member as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlayerSummary {
    /// Stable identity of the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Accumulated score.
    pub score: u32,
    /// Whether a live connection currently backs this player.
    pub connected: bool,
    /// Whether this player hosts the room.
    pub is_host: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            score: player.score,
            connected: player.connected,
            is_host: player.is_host,
        }
    }
}

/// Full room snapshot sent on create and join.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomSnapshot {
    /// Invite code of the room.
    pub code: String,
    /// Members in join order.
    pub players: Vec<PlayerSummary>,
    /// Current lifecycle phase.
    pub phase: RoomPhaseDto,
    /// Maximum number of members allowed.
    pub max_players: usize,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            code: room.code.clone(),
            players: room.players.values().map(PlayerSummary::from).collect(),
            phase: room.phase.into(),
            max_players: room.max_players,
        }
    }
}

/// One line of a score listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScoreEntry {
    /// Identity of the player.
    pub player_id: Uuid,
    /// Display name of the player.
    pub player_name: String,
    /// Accumulated score.
    pub score: u32,
}

impl From<ScoreLine> for ScoreEntry {
    fn from(line: ScoreLine) -> Self {
        Self {
            player_id: line.player_id,
            player_name: line.player_name,
            score: line.score,
        }
    }
}

/// End-of-game summary sent to every participant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FinalResultsDto {
    /// Final scores, best first.
    pub final_scores: Vec<ScoreEntry>,
    /// Every player whose score equals the maximum.
    pub winners: Vec<ScoreEntry>,
    /// True when more than one player shares the top score.
    pub is_tie: bool,
    /// Wall-clock game duration in milliseconds.
    pub duration_ms: u64,
}

impl From<FinalResults> for FinalResultsDto {
    fn from(results: FinalResults) -> Self {
        Self {
            final_scores: results.final_scores.into_iter().map(Into::into).collect(),
            winners: results.winners.into_iter().map(Into::into).collect(),
            is_tie: results.is_tie,
            duration_ms: results.duration_ms,
        }
    }
}

/// Lobby member as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LobbyPlayerSummary {
    /// Stable identity of the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Whether a live connection currently backs this player.
    pub connected: bool,
}

impl From<&LobbyPlayer> for LobbyPlayerSummary {
    fn from(player: &LobbyPlayer) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            connected: player.connected,
        }
    }
}

/// Lobby chat entry as exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageDto {
    /// Unique message id.
    pub id: Uuid,
    /// Author identity; absent for server announcements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<Uuid>,
    /// Author display name.
    pub author_name: String,
    /// Message body.
    pub text: String,
    /// Creation timestamp (milliseconds since the Unix epoch).
    pub timestamp_ms: u64,
    /// Either `user` or `system`.
    pub kind: String,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            author_id: message.author_id,
            author_name: message.author_name.clone(),
            text: message.text.clone(),
            timestamp_ms: message.timestamp_ms,
            kind: match message.kind {
                ChatKind::User => "user".to_string(),
                ChatKind::System => "system".to_string(),
            },
        }
    }
}
