//! Room-less global lobby: presence pool, bounded chat history, and the
//! shared "big game" slot.

use std::collections::VecDeque;

use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use crate::state::{
    engine::GameEngine,
    game::{Player, unix_millis},
};

/// Error returned when a lobby operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LobbyError {
    /// The player is not a lobby member.
    #[error("player is not in the lobby")]
    NotInLobby,
    /// The player is already a lobby member.
    #[error("player already joined the lobby")]
    AlreadyJoined,
    /// A lobby game is already starting or playing.
    #[error("a lobby game is already underway")]
    GameAlreadyRunning,
    /// Fewer than two connected players are present.
    #[error("at least two connected players are required to start a lobby game")]
    NotEnoughPlayers,
    /// No lobby game is currently running.
    #[error("no lobby game is in progress")]
    NoGame,
}

/// Reduced identity for members of the room-less global pool.
#[derive(Debug, Clone)]
pub struct LobbyPlayer {
    /// Server-assigned identity.
    pub id: Uuid,
    /// Display name chosen by the player.
    pub name: String,
    /// Whether a live connection currently backs this player.
    pub connected: bool,
    /// Join timestamp in milliseconds since the Unix epoch; defines ordering.
    pub joined_at_ms: u64,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// A regular message typed by a player.
    User,
    /// A server-generated announcement (joins, departures, game events).
    System,
}

/// One entry of the lobby chat history.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Unique message id.
    pub id: Uuid,
    /// Author identity; absent for system messages.
    pub author_id: Option<Uuid>,
    /// Author display name, or a fixed server label for system messages.
    pub author_name: String,
    /// Message body.
    pub text: String,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Whether the message came from a player or the server.
    pub kind: ChatKind,
}

/// Where the shared lobby game currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyGameStatus {
    /// The pre-start countdown is running.
    Starting,
    /// The engine has started and questions are in play.
    Playing,
}

/// The lobby's single shared game and its countdown bookkeeping.
pub struct LobbyGame {
    /// The engine driving the shared game.
    pub engine: GameEngine,
    /// Countdown or active play.
    pub status: LobbyGameStatus,
    /// Player who initiated the game; the only one allowed to advance it.
    pub initiator: Uuid,
    /// Snapshot of the lobby players captured at start time.
    pub participants: Vec<Uuid>,
    /// Cancellation handle for the countdown task, present while counting down.
    pub countdown_cancel: Option<watch::Sender<bool>>,
}

impl LobbyGame {
    /// Signal the countdown task to stop, dropping the handle so no timer dangles.
    pub fn cancel_countdown(&mut self) {
        if let Some(cancel) = self.countdown_cancel.take() {
            let _ = cancel.send(true);
        }
    }
}

/// The room-less global membership pool.
pub struct GlobalLobby {
    players: IndexMap<Uuid, LobbyPlayer>,
    chat: VecDeque<ChatMessage>,
    chat_limit: usize,
    /// The shared "big game", exclusively owned by the lobby.
    pub game: Option<LobbyGame>,
}

/// Server label used as the author name of system chat messages.
pub const SYSTEM_AUTHOR: &str = "server";

impl GlobalLobby {
    /// Create an empty lobby retaining at most `chat_limit` chat messages.
    pub fn new(chat_limit: usize) -> Self {
        Self {
            players: IndexMap::new(),
            chat: VecDeque::new(),
            chat_limit,
            game: None,
        }
    }

    /// Add a player to the pool.
    pub fn join(&mut self, player_id: Uuid, name: String) -> Result<&LobbyPlayer, LobbyError> {
        if self.players.contains_key(&player_id) {
            return Err(LobbyError::AlreadyJoined);
        }
        self.players.insert(
            player_id,
            LobbyPlayer {
                id: player_id,
                name,
                connected: true,
                joined_at_ms: unix_millis(),
            },
        );
        Ok(&self.players[&player_id])
    }

    /// Remove a player from the pool.
    pub fn leave(&mut self, player_id: Uuid) -> Result<LobbyPlayer, LobbyError> {
        self.players
            .shift_remove(&player_id)
            .ok_or(LobbyError::NotInLobby)
    }

    /// Whether the player is currently a lobby member.
    pub fn contains(&self, player_id: Uuid) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Members ordered by join time.
    pub fn players(&self) -> impl Iterator<Item = &LobbyPlayer> {
        self.players.values()
    }

    /// Member ids, used as the lobby broadcast group.
    pub fn member_ids(&self) -> Vec<Uuid> {
        self.players.keys().copied().collect()
    }

    /// Number of currently-connected members.
    pub fn connected_count(&self) -> usize {
        self.players.values().filter(|player| player.connected).count()
    }

    /// Display name of a member, if present.
    pub fn player_name(&self, player_id: Uuid) -> Option<&str> {
        self.players.get(&player_id).map(|player| player.name.as_str())
    }

    /// Append a player-authored chat message, dropping the oldest past the cap.
    pub fn push_user_message(
        &mut self,
        author_id: Uuid,
        author_name: String,
        text: String,
    ) -> &ChatMessage {
        self.push_message(ChatMessage {
            id: Uuid::new_v4(),
            author_id: Some(author_id),
            author_name,
            text,
            timestamp_ms: unix_millis(),
            kind: ChatKind::User,
        })
    }

    /// Append a server announcement, dropping the oldest past the cap.
    pub fn push_system_message(&mut self, text: String) -> &ChatMessage {
        self.push_message(ChatMessage {
            id: Uuid::new_v4(),
            author_id: None,
            author_name: SYSTEM_AUTHOR.to_string(),
            text,
            timestamp_ms: unix_millis(),
            kind: ChatKind::System,
        })
    }

    /// Chat history from oldest to newest.
    pub fn chat_history(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.iter()
    }

    /// True only when at least two connected players are present and no
    /// lobby game is already starting or playing.
    pub fn can_start_game(&self) -> bool {
        self.game.is_none() && self.connected_count() >= 2
    }

    /// Snapshot the currently-connected members as a game roster.
    ///
    /// The initiator is marked host so host-only checks carry over from the
    /// room flow.
    pub fn game_roster(&self, initiator: Uuid) -> IndexMap<Uuid, Player> {
        self.players
            .values()
            .filter(|player| player.connected)
            .map(|player| {
                (
                    player.id,
                    Player::new(player.id, player.name.clone(), player.id == initiator),
                )
            })
            .collect()
    }

    /// True when a lobby game exists but none of its original participants
    /// is still a connected lobby member.
    pub fn game_is_stale(&self) -> bool {
        match &self.game {
            Some(game) => !game.participants.iter().any(|id| {
                self.players
                    .get(id)
                    .map(|player| player.connected)
                    .unwrap_or(false)
            }),
            None => false,
        }
    }

    /// Drop the current game, cancelling its countdown if one is running.
    pub fn reset_game(&mut self) {
        if let Some(mut game) = self.game.take() {
            game.cancel_countdown();
        }
    }

    fn push_message(&mut self, message: ChatMessage) -> &ChatMessage {
        if self.chat.len() == self.chat_limit {
            self.chat.pop_front();
        }
        self.chat.push_back(message);
        self.chat.back().expect("message pushed above")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::Question;

    fn sample_questions() -> Vec<Question> {
        vec![Question {
            id: "q1".into(),
            text: "?".into(),
            audio: None,
            options: vec!["a".into(), "b".into()],
            correct_option_index: 0,
        }]
    }

    #[test]
    fn join_and_leave_maintain_membership() {
        let mut lobby = GlobalLobby::new(10);
        let id = Uuid::new_v4();
        lobby.join(id, "alice".into()).unwrap();
        assert!(lobby.contains(id));
        assert_eq!(lobby.join(id, "alice".into()).unwrap_err(), LobbyError::AlreadyJoined);

        lobby.leave(id).unwrap();
        assert!(!lobby.contains(id));
        assert_eq!(lobby.leave(id).unwrap_err(), LobbyError::NotInLobby);
    }

    #[test]
    fn chat_history_drops_oldest_past_the_cap() {
        let mut lobby = GlobalLobby::new(3);
        let id = Uuid::new_v4();
        lobby.join(id, "alice".into()).unwrap();
        for index in 0..5 {
            lobby.push_user_message(id, "alice".into(), format!("message {index}"));
        }
        let texts: Vec<&str> = lobby.chat_history().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["message 2", "message 3", "message 4"]);
    }

    #[test]
    fn lobby_game_requires_two_connected_players() {
        let mut lobby = GlobalLobby::new(10);
        let first = Uuid::new_v4();
        lobby.join(first, "alice".into()).unwrap();
        assert!(!lobby.can_start_game());

        let second = Uuid::new_v4();
        lobby.join(second, "bob".into()).unwrap();
        assert!(lobby.can_start_game());

        lobby.game = Some(LobbyGame {
            engine: GameEngine::new(sample_questions(), &lobby.game_roster(first)),
            status: LobbyGameStatus::Starting,
            initiator: first,
            participants: vec![first, second],
            countdown_cancel: None,
        });
        assert!(!lobby.can_start_game());
    }

    #[test]
    fn stale_detection_fires_when_all_participants_left() {
        let mut lobby = GlobalLobby::new(10);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        lobby.join(first, "alice".into()).unwrap();
        lobby.join(second, "bob".into()).unwrap();

        lobby.game = Some(LobbyGame {
            engine: GameEngine::new(sample_questions(), &lobby.game_roster(first)),
            status: LobbyGameStatus::Playing,
            initiator: first,
            participants: vec![first, second],
            countdown_cancel: None,
        });
        assert!(!lobby.game_is_stale());

        lobby.leave(first).unwrap();
        assert!(!lobby.game_is_stale());
        lobby.leave(second).unwrap();
        assert!(lobby.game_is_stale());

        lobby.reset_game();
        assert!(lobby.game.is_none());
    }

    #[test]
    fn game_roster_marks_the_initiator_as_host() {
        let mut lobby = GlobalLobby::new(10);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        lobby.join(first, "alice".into()).unwrap();
        lobby.join(second, "bob".into()).unwrap();

        let roster = lobby.game_roster(second);
        assert_eq!(roster.len(), 2);
        assert!(roster[&second].is_host);
        assert!(!roster[&first].is_host);
    }
}
