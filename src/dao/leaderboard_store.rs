use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use futures::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tracing::debug;

use crate::dao::{
    models::{GameDefinitionEntity, LeaderboardEntryEntity, PersistedLeaderboard},
    storage::{StorageError, StorageResult},
};

/// File name of the score entry document.
const ENTRIES_FILE: &str = "leaderboard.json";
/// File name of the game definition document.
const DEFINITIONS_FILE: &str = "games.json";

/// Abstraction over the persistence layer for the global leaderboard.
pub trait LeaderboardStore: Send + Sync {
    /// Load the persisted leaderboard, `None` when nothing was saved yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<PersistedLeaderboard>>>;
    /// Persist the whole leaderboard, replacing any previous document.
    fn save(&self, board: PersistedLeaderboard) -> BoxFuture<'static, StorageResult<()>>;
}

/// Store writing the leaderboard as JSON documents in a local directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entries_path(&self) -> PathBuf {
        self.dir.join(ENTRIES_FILE)
    }

    fn definitions_path(&self) -> PathBuf {
        self.dir.join(DEFINITIONS_FILE)
    }
}

impl LeaderboardStore for JsonFileStore {
    fn load(&self) -> BoxFuture<'static, StorageResult<Option<PersistedLeaderboard>>> {
        let entries_path = self.entries_path();
        let definitions_path = self.definitions_path();
        Box::pin(async move {
            let entries: Option<HashMap<String, Vec<LeaderboardEntryEntity>>> =
                read_document(&entries_path).await?;
            let definitions: Option<HashMap<String, GameDefinitionEntity>> =
                read_document(&definitions_path).await?;

            if entries.is_none() && definitions.is_none() {
                return Ok(None);
            }
            Ok(Some(PersistedLeaderboard {
                entries: entries.unwrap_or_default(),
                definitions: definitions.unwrap_or_default(),
            }))
        })
    }

    fn save(&self, board: PersistedLeaderboard) -> BoxFuture<'static, StorageResult<()>> {
        let dir = self.dir.clone();
        let entries_path = self.entries_path();
        let definitions_path = self.definitions_path();
        Box::pin(async move {
            fs::create_dir_all(&dir).await.map_err(|err| {
                StorageError::unavailable(
                    format!("cannot create storage directory {}", dir.display()),
                    err,
                )
            })?;
            write_document(&entries_path, &board.entries).await?;
            write_document(&definitions_path, &board.definitions).await?;
            debug!(dir = %dir.display(), "leaderboard flushed to disk");
            Ok(())
        })
    }
}

/// Read and decode one JSON document, mapping a missing file to `None`.
async fn read_document<T: DeserializeOwned>(path: &Path) -> StorageResult<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("cannot read {}", path.display()),
                err,
            ));
        }
    };
    let value = serde_json::from_slice(&bytes).map_err(|err| {
        StorageError::corrupt(format!("cannot decode {}", path.display()), err)
    })?;
    Ok(Some(value))
}

/// Encode and write one JSON document via a temporary file and rename, so a
/// crash mid-write never leaves a truncated document behind.
async fn write_document<T: Serialize>(path: &Path, value: &T) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|err| {
        StorageError::unavailable(format!("cannot encode {}", path.display()), err)
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &bytes).await.map_err(|err| {
        StorageError::unavailable(format!("cannot write {}", tmp.display()), err)
    })?;
    fs::rename(&tmp, path).await.map_err(|err| {
        StorageError::unavailable(format!("cannot rename {}", tmp.display()), err)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GlobalLeaderboard;
    use crate::state::engine::ScoreLine;
    use crate::state::game::Question;
    use uuid::Uuid;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("quiz-rally-store-{tag}-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn load_returns_none_when_nothing_was_saved() {
        let store = JsonFileStore::new(temp_dir("empty"));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_board() {
        let dir = temp_dir("roundtrip");
        let store = JsonFileStore::new(dir.clone());

        let mut board = GlobalLeaderboard::new(100);
        let questions = vec![Question {
            id: "q1".into(),
            text: "?".into(),
            audio: None,
            options: vec!["a".into(), "b".into()],
            correct_option_index: 0,
        }];
        let id = board.submit_results(
            &questions,
            "ROOMAA",
            &[ScoreLine {
                player_id: Uuid::new_v4(),
                player_name: "alice".into(),
                score: 150,
            }],
            7_500,
        );

        store.save(PersistedLeaderboard::snapshot(&board)).await.unwrap();
        let restored = store
            .load()
            .await
            .unwrap()
            .expect("saved document present")
            .into_leaderboard(100);

        assert_eq!(restored.leaderboard(&id, 10).len(), 1);
        assert_eq!(restored.leaderboard(&id, 10)[0].player_name, "alice");
        assert_eq!(restored.definition(&id).unwrap().question_count, 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported_as_such() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ENTRIES_FILE), b"{not json").unwrap();

        let store = JsonFileStore::new(dir.clone());
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));

        let _ = std::fs::remove_dir_all(dir);
    }
}
