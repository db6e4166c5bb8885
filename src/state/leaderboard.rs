//! Cross-session leaderboard keyed by a content hash of the question set.

use std::collections::HashMap;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::state::{
    engine::ScoreLine,
    game::{Question, unix_millis},
};

/// Width, in hex characters, of a truncated game identifier.
const GAME_ID_LEN: usize = 16;

/// One persisted score entry for a finished game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Identity of the scoring player.
    pub player_id: Uuid,
    /// Display name at the time the game finished.
    pub player_name: String,
    /// Final score; only positive scores are recorded.
    pub score: u32,
    /// Code of the room the game ran in, or the lobby sentinel.
    pub room_code: String,
    /// Submission timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Wall-clock duration of the game in milliseconds.
    pub duration_ms: u64,
}

/// Identity record of a question set seen by the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDefinition {
    /// Content hash of the question set.
    pub game_id: String,
    /// Ids of the questions, in play order.
    pub question_ids: Vec<String>,
    /// Number of questions in the set.
    pub question_count: usize,
    /// First time this set was seen, in milliseconds since the Unix epoch.
    pub first_seen_ms: u64,
}

/// Compute the deterministic identifier of an ordered question set.
///
/// Two independently-run rooms playing an identical set map to the same
/// identifier; any change to a question's id, text, order, or answer key
/// yields a different one.
pub fn game_id(questions: &[Question]) -> String {
    let mut hasher = Sha256::new();
    for question in questions {
        hasher.update(question.id.as_bytes());
        hasher.update([0]);
        hasher.update(question.text.as_bytes());
        hasher.update([0]);
        hasher.update((question.correct_option_index as u64).to_le_bytes());
        hasher.update([0]);
    }
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(GAME_ID_LEN);
    for byte in digest.iter().take(GAME_ID_LEN / 2) {
        hex.push_str(&format!("{byte:02x}"));
    }
    hex
}

/// Top-N score entries per question-set identity, ranked on write.
///
/// The in-memory maps are the source of truth; persistence is a debounced,
/// best-effort mirror handled by the persistence worker.
pub struct GlobalLeaderboard {
    entries: HashMap<String, Vec<LeaderboardEntry>>,
    definitions: HashMap<String, GameDefinition>,
    top_n: usize,
}

impl GlobalLeaderboard {
    /// Create an empty leaderboard retaining at most `top_n` entries per group.
    pub fn new(top_n: usize) -> Self {
        Self {
            entries: HashMap::new(),
            definitions: HashMap::new(),
            top_n,
        }
    }

    /// Rebuild a leaderboard from previously persisted state.
    pub fn restore(
        entries: HashMap<String, Vec<LeaderboardEntry>>,
        definitions: HashMap<String, GameDefinition>,
        top_n: usize,
    ) -> Self {
        let mut board = Self {
            entries,
            definitions,
            top_n,
        };
        for group in board.entries.values_mut() {
            Self::rank_group(group, top_n);
        }
        board
    }

    /// Record the outcome of one finished game.
    ///
    /// Registers the game definition on first sight, appends one entry per
    /// player with a positive score, then re-ranks and truncates the group.
    /// Returns the game identifier the results were filed under.
    pub fn submit_results(
        &mut self,
        questions: &[Question],
        room_code: &str,
        scores: &[ScoreLine],
        duration_ms: u64,
    ) -> String {
        let id = game_id(questions);
        let now = unix_millis();

        self.definitions
            .entry(id.clone())
            .or_insert_with(|| GameDefinition {
                game_id: id.clone(),
                question_ids: questions.iter().map(|q| q.id.clone()).collect(),
                question_count: questions.len(),
                first_seen_ms: now,
            });

        let group = self.entries.entry(id.clone()).or_default();
        for line in scores {
            if line.score == 0 {
                continue;
            }
            group.push(LeaderboardEntry {
                player_id: line.player_id,
                player_name: line.player_name.clone(),
                score: line.score,
                room_code: room_code.to_string(),
                timestamp_ms: now,
                duration_ms,
            });
        }
        Self::rank_group(group, self.top_n);

        tracing::info!(game_id = %id, room_code, entries = group.len(), "leaderboard results submitted");
        id
    }

    /// Ranked entries for a question-set identity, best first.
    pub fn leaderboard(&self, game_id: &str, limit: usize) -> Vec<LeaderboardEntry> {
        self.entries
            .get(game_id)
            .map(|group| group.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// A player's best recorded score within one group.
    pub fn player_best_score(&self, game_id: &str, player_id: Uuid) -> Option<u32> {
        self.entries
            .get(game_id)?
            .iter()
            .filter(|entry| entry.player_id == player_id)
            .map(|entry| entry.score)
            .max()
    }

    /// A player's rank within one group.
    ///
    /// Rank is 1 plus the number of distinct players with a strictly greater
    /// best score. `None` when the player has no recorded entry.
    pub fn player_rank(&self, game_id: &str, player_id: Uuid) -> Option<usize> {
        let own_best = self.player_best_score(game_id, player_id)?;
        let group = self.entries.get(game_id)?;

        let mut best_by_player: HashMap<Uuid, u32> = HashMap::new();
        for entry in group {
            let best = best_by_player.entry(entry.player_id).or_insert(entry.score);
            if entry.score > *best {
                *best = entry.score;
            }
        }
        let better = best_by_player
            .values()
            .filter(|score| **score > own_best)
            .count();
        Some(better + 1)
    }

    /// Identity record of a question set, if it has been seen.
    pub fn definition(&self, game_id: &str) -> Option<&GameDefinition> {
        self.definitions.get(game_id)
    }

    /// Known game identifiers.
    pub fn game_ids(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    /// Drop every entry and definition.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.definitions.clear();
    }

    /// Clone the underlying maps for persistence.
    pub fn snapshot(
        &self,
    ) -> (
        HashMap<String, Vec<LeaderboardEntry>>,
        HashMap<String, GameDefinition>,
    ) {
        (self.entries.clone(), self.definitions.clone())
    }

    fn rank_group(group: &mut Vec<LeaderboardEntry>, top_n: usize) {
        group.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.timestamp_ms.cmp(&b.timestamp_ms))
        });
        group.truncate(top_n);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, text: &str, correct: usize) -> Question {
        Question {
            id: id.into(),
            text: text.into(),
            audio: None,
            options: vec!["a".into(), "b".into()],
            correct_option_index: correct,
        }
    }

    fn line(name: &str, score: u32) -> ScoreLine {
        ScoreLine {
            player_id: Uuid::new_v4(),
            player_name: name.into(),
            score,
        }
    }

    #[test]
    fn game_id_is_deterministic_and_content_sensitive() {
        let set = vec![question("q1", "first", 0), question("q2", "second", 1)];
        let reloaded = set.clone();
        assert_eq!(game_id(&set), game_id(&reloaded));
        assert_eq!(game_id(&set).len(), GAME_ID_LEN);

        let mut different_key = set.clone();
        different_key[0].correct_option_index = 1;
        assert_ne!(game_id(&set), game_id(&different_key));

        let reordered = vec![set[1].clone(), set[0].clone()];
        assert_ne!(game_id(&set), game_id(&reordered));
    }

    #[test]
    fn zero_score_players_are_excluded() {
        let mut board = GlobalLeaderboard::new(100);
        let set = vec![question("q1", "first", 0)];
        let scores = vec![line("winner", 150), line("idle", 0)];

        let id = board.submit_results(&set, "ABCDEF", &scores, 9_000);
        let entries = board.leaderboard(&id, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player_name, "winner");
        assert_eq!(board.player_rank(&id, scores[0].player_id), Some(1));
        assert_eq!(board.player_rank(&id, scores[1].player_id), None);
    }

    #[test]
    fn groups_are_ranked_and_truncated_on_write() {
        let mut board = GlobalLeaderboard::new(3);
        let set = vec![question("q1", "first", 0)];
        for score in [100, 250, 150, 400, 200] {
            board.submit_results(&set, "ROOM", &[line("p", score)], 1_000);
        }

        let id = game_id(&set);
        let scores: Vec<u32> = board
            .leaderboard(&id, 10)
            .iter()
            .map(|entry| entry.score)
            .collect();
        assert_eq!(scores, vec![400, 250, 200]);
    }

    #[test]
    fn equal_scores_rank_by_earlier_submission() {
        let mut board = GlobalLeaderboard::new(100);
        let set = vec![question("q1", "first", 0)];
        let early = line("early", 200);
        let id = board.submit_results(&set, "ROOM", &[early.clone()], 1_000);

        // Later entry with the same score must sort after the earlier one.
        let group = board.entries.get_mut(&id).unwrap();
        let late = LeaderboardEntry {
            player_id: Uuid::new_v4(),
            player_name: "late".into(),
            score: 200,
            room_code: "ROOM".into(),
            timestamp_ms: group[0].timestamp_ms + 1,
            duration_ms: 1_000,
        };
        group.push(late);
        GlobalLeaderboard::rank_group(group, 100);

        let names: Vec<String> = board
            .leaderboard(&id, 10)
            .iter()
            .map(|entry| entry.player_name.clone())
            .collect();
        assert_eq!(names, vec!["early".to_string(), "late".to_string()]);
    }

    #[test]
    fn player_rank_counts_distinct_better_players() {
        let mut board = GlobalLeaderboard::new(100);
        let set = vec![question("q1", "first", 0)];
        let top = line("top", 400);
        let middle = line("middle", 250);
        let bottom = line("bottom", 100);
        let id = board.submit_results(
            &set,
            "ROOM",
            &[top.clone(), middle.clone(), bottom.clone()],
            1_000,
        );
        // A second, worse run by the top player must not affect ranks.
        board.submit_results(
            &set,
            "ROOM",
            &[ScoreLine {
                player_id: top.player_id,
                player_name: "top".into(),
                score: 120,
            }],
            1_000,
        );

        assert_eq!(board.player_rank(&id, top.player_id), Some(1));
        assert_eq!(board.player_rank(&id, middle.player_id), Some(2));
        assert_eq!(board.player_rank(&id, bottom.player_id), Some(3));
        assert_eq!(board.player_best_score(&id, top.player_id), Some(400));
    }

    #[test]
    fn reset_clears_all_groups() {
        let mut board = GlobalLeaderboard::new(100);
        let set = vec![question("q1", "first", 0)];
        let id = board.submit_results(&set, "ROOM", &[line("p", 100)], 1_000);

        board.reset();
        assert!(board.leaderboard(&id, 10).is_empty());
        assert!(board.definition(&id).is_none());
    }
}
