//! Shared application state: connection registry, room zone, global lobby,
//! and the persistent leaderboard.

pub mod engine;
pub mod game;
pub mod leaderboard;
pub mod lobby;
pub mod rooms;

use std::{collections::HashMap, sync::Arc};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc, watch};
use uuid::Uuid;

use crate::config::AppConfig;

pub use self::engine::{GameEngine, GameError};
pub use self::game::{Player, Question, Room, RoomPhase};
pub use self::leaderboard::GlobalLeaderboard;
pub use self::lobby::GlobalLobby;
pub use self::rooms::{RoomDirectory, RoomError};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Identity the connection authenticated as.
    pub player_id: Uuid,
    /// Sender feeding the connection's dedicated writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Room directory plus the engines of rooms whose game is in play.
///
/// Both live under one lock so that membership changes and engine updates
/// for the same room are applied atomically.
pub struct RoomZone {
    /// Directory of active rooms and the player-to-room index.
    pub directory: RoomDirectory,
    /// Engines keyed by room code, present only while a game runs.
    pub engines: HashMap<String, GameEngine>,
}

/// Central application state storing connections and the game aggregates.
///
/// Lock order when more than one aggregate is needed: `rooms` before
/// `leaderboard`, `lobby` before `leaderboard`. `rooms` and `lobby` are
/// never held together.
pub struct AppState {
    /// Immutable runtime configuration.
    pub config: AppConfig,
    /// The question set every game plays, loaded once at boot.
    pub questions: Vec<Question>,
    /// Registry of active client sockets keyed by player id.
    pub connections: DashMap<Uuid, ClientConnection>,
    /// Active rooms and their running engines.
    pub rooms: Mutex<RoomZone>,
    /// The room-less global pool and its shared game.
    pub lobby: Mutex<GlobalLobby>,
    /// Cross-session scores keyed by question-set identity.
    pub leaderboard: Mutex<GlobalLeaderboard>,
    dirty: watch::Sender<u64>,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, questions: Vec<Question>, leaderboard: GlobalLeaderboard) -> SharedState {
        let (dirty_tx, _rx) = watch::channel(0);
        let room_zone = RoomZone {
            directory: RoomDirectory::new(config.room_code_length, config.max_players_per_room),
            engines: HashMap::new(),
        };
        let lobby = GlobalLobby::new(config.chat_history_limit);
        Arc::new(Self {
            config,
            questions,
            connections: DashMap::new(),
            rooms: Mutex::new(room_zone),
            lobby: Mutex::new(lobby),
            leaderboard: Mutex::new(leaderboard),
            dirty: dirty_tx,
        })
    }

    /// Bump the dirty generation so the persistence worker schedules a flush.
    pub fn mark_leaderboard_dirty(&self) {
        self.dirty.send_modify(|generation| *generation += 1);
    }

    /// Subscribe to dirty generation updates.
    pub fn dirty_watcher(&self) -> watch::Receiver<u64> {
        self.dirty.subscribe()
    }
}
