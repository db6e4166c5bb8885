//! Application-level configuration loading with a JSON file and environment override.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_RALLY_CONFIG_PATH";

/// Default path of the question set document.
const DEFAULT_QUESTIONS_PATH: &str = "config/questions.json";
/// Default directory holding the persisted leaderboard documents.
const DEFAULT_STORAGE_DIR: &str = "data";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Path of the JSON document holding the configured question set.
    pub questions_path: PathBuf,
    /// Directory where the leaderboard documents are persisted.
    pub storage_dir: PathBuf,
    /// Maximum number of players allowed in a single room.
    pub max_players_per_room: usize,
    /// Length of generated room codes.
    pub room_code_length: usize,
    /// Maximum number of lobby chat messages retained in memory.
    pub chat_history_limit: usize,
    /// Countdown length, in seconds, announced before a lobby game starts.
    pub lobby_countdown_secs: u64,
    /// Number of entries retained per leaderboard group.
    pub leaderboard_top_n: usize,
    /// Quiet period, in milliseconds, before a leaderboard mutation is flushed to disk.
    pub persist_debounce_ms: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration from file");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            questions_path: PathBuf::from(DEFAULT_QUESTIONS_PATH),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            max_players_per_room: 8,
            room_code_length: 6,
            chat_history_limit: 100,
            lobby_countdown_secs: 5,
            leaderboard_top_n: 100,
            persist_debounce_ms: 2_000,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file, every field optional.
struct RawConfig {
    questions_path: Option<PathBuf>,
    storage_dir: Option<PathBuf>,
    max_players_per_room: Option<usize>,
    room_code_length: Option<usize>,
    chat_history_limit: Option<usize>,
    lobby_countdown_secs: Option<u64>,
    leaderboard_top_n: Option<usize>,
    persist_debounce_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            questions_path: raw.questions_path.unwrap_or(defaults.questions_path),
            storage_dir: raw.storage_dir.unwrap_or(defaults.storage_dir),
            max_players_per_room: raw
                .max_players_per_room
                .unwrap_or(defaults.max_players_per_room),
            room_code_length: raw.room_code_length.unwrap_or(defaults.room_code_length),
            chat_history_limit: raw.chat_history_limit.unwrap_or(defaults.chat_history_limit),
            lobby_countdown_secs: raw
                .lobby_countdown_secs
                .unwrap_or(defaults.lobby_countdown_secs),
            leaderboard_top_n: raw.leaderboard_top_n.unwrap_or(defaults.leaderboard_top_n),
            persist_debounce_ms: raw
                .persist_debounce_ms
                .unwrap_or(defaults.persist_debounce_ms),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
