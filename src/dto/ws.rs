use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::game::{
    ChatMessageDto, FinalResultsDto, LobbyPlayerSummary, PlayerSummary, QuestionDto, RoomSnapshot,
    ScoreEntry,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from WebSocket clients.
///
/// The envelope is a closed tagged union; unrecognized tags decode to
/// [`ClientMessage::Unknown`] and are answered with an error event instead
/// of tearing the connection down.
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Identification, required as the first message on a fresh socket.
    Hello {
        /// Previously assigned identity, resupplied to reconnect as the same player.
        #[serde(default)]
        player_id: Option<Uuid>,
    },
    /// Create a room with the sender as host.
    CreateRoom { name: String },
    /// Join an existing room by invite code.
    JoinRoom { code: String, name: String },
    /// Leave the current room.
    LeaveRoom,
    /// Start the room's game. Host only.
    StartGame,
    /// Answer the current room question.
    SubmitAnswer { option_index: usize },
    /// Advance the room game to the next question. Host only.
    NextQuestion,
    /// Enter the global lobby.
    JoinLobby { name: String },
    /// Leave the global lobby.
    LeaveLobby,
    /// Post a chat message to the lobby.
    LobbyMessage { text: String },
    /// Start the shared lobby game countdown.
    StartLobbyGame,
    /// Answer the current lobby question.
    SubmitLobbyAnswer { option_index: usize },
    /// Advance the lobby game to the next question. Initiator only.
    LobbyNextQuestion,
    #[serde(other)]
    /// Any unrecognized message tag.
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Messages pushed to WebSocket clients.
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Identification acknowledgement carrying the (possibly new) identity.
    Welcome { player_id: Uuid },
    /// The sender's room was created.
    RoomCreated { room: RoomSnapshot },
    /// The sender joined a room.
    RoomJoined { room: RoomSnapshot, player_id: Uuid },
    /// Another player joined the sender's room.
    PlayerJoined { player: PlayerSummary },
    /// A player left the sender's room.
    PlayerLeft {
        player_id: Uuid,
        /// Newly promoted host, present when the departing player was host.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_host: Option<Uuid>,
    },
    /// The room's game started; carries the first question.
    GameStarted { question: QuestionDto },
    /// The room advanced to a new question.
    NextQuestion { question: QuestionDto },
    /// A player locked in an answer (which answer is not revealed).
    PlayerAnswered { player_id: Uuid },
    /// Private acknowledgement of the sender's own answer.
    AnswerAccepted { is_correct: bool, points_awarded: u32 },
    /// Everyone answered; the round resolves.
    RoundResults {
        scores: Vec<ScoreEntry>,
        correct_option_index: usize,
    },
    /// The game ran to completion.
    GameEnded { results: FinalResultsDto },
    /// The sender entered the lobby.
    LobbyJoined {
        player_id: Uuid,
        players: Vec<LobbyPlayerSummary>,
    },
    /// Chat backlog replayed to a player entering the lobby.
    LobbyChatHistory { messages: Vec<ChatMessageDto> },
    /// Lobby membership changed.
    LobbyPlayersUpdated { players: Vec<LobbyPlayerSummary> },
    /// A chat message was posted to the lobby.
    LobbyChatMessage { message: ChatMessageDto },
    /// Countdown tick before the shared lobby game starts.
    LobbyGameStarting { seconds_remaining: u64 },
    /// The pending lobby game was cancelled before starting.
    LobbyGameCancelled { reason: String },
    /// The shared lobby game started; carries the first question.
    LobbyGameStarted { question: QuestionDto },
    /// The lobby game advanced to a new question.
    LobbyNextQuestion { question: QuestionDto },
    /// A lobby participant locked in an answer.
    LobbyPlayerAnswered { player_id: Uuid },
    /// Private acknowledgement of the sender's own lobby answer.
    LobbyAnswerAccepted { is_correct: bool, points_awarded: u32 },
    /// Every connected lobby participant answered; the round resolves.
    LobbyRoundResults {
        scores: Vec<ScoreEntry>,
        correct_option_index: usize,
    },
    /// The lobby game ran to completion.
    LobbyGameEnded { results: FinalResultsDto },
    /// A request could not be applied; the connection stays open.
    Error { message: String },
}
