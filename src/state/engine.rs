//! Pure per-session question/answer/score state machine. No I/O, no networking.

use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

use crate::state::game::{Player, Question, unix_millis};

/// Points awarded for any correct answer.
pub const BASE_POINTS: u32 = 100;
/// Extra points for the chronologically first correct answer of a question.
pub const FIRST_CORRECT_BONUS: u32 = 50;

/// Error returned when an engine operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// `start` was called on an engine that already left the not-started state.
    #[error("game already started")]
    AlreadyStarted,
    /// The engine was constructed with an empty question list.
    #[error("game has no questions")]
    NoQuestions,
    /// The engine was constructed with an empty roster.
    #[error("game has no players")]
    NoPlayers,
    /// A gameplay operation arrived before `start`.
    #[error("game not started")]
    NotStarted,
    /// A gameplay operation arrived after the game finished.
    #[error("game already finished")]
    Finished,
    /// The submitting player is not part of this session's roster.
    #[error("unknown player")]
    UnknownPlayer,
    /// The player already answered the current question.
    #[error("player already answered this question")]
    AlreadyAnswered,
    /// The submitted option index is out of range for the current question.
    #[error("answer index out of range")]
    InvalidOptionIndex,
    /// A question in the set is structurally unusable.
    #[error("invalid question format: {0}")]
    InvalidQuestionFormat(String),
}

/// Question payload safe to transmit to clients: the answer key is stripped
/// and a 1-based position annotation is added.
#[derive(Debug, Clone)]
pub struct ClientQuestion {
    /// Stable identifier of the question.
    pub id: String,
    /// The question text.
    pub text: String,
    /// Optional audio asset URL.
    pub audio: Option<String>,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// 1-based position of this question within the set.
    pub number: usize,
    /// Total number of questions in the set.
    pub total: usize,
}

/// Result of a single accepted answer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    /// Whether the submitted option was the correct one.
    pub is_correct: bool,
    /// Points credited to the player for this submission.
    pub points_awarded: u32,
}

/// Result of advancing past the current question.
#[derive(Debug, Clone)]
pub struct Advance {
    /// The next question, absent when the set is exhausted.
    pub question: Option<ClientQuestion>,
    /// True when the advance transitioned the game to the finished state.
    pub game_finished: bool,
}

/// One line of a score listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreLine {
    /// Identity of the player.
    pub player_id: Uuid,
    /// Display name of the player.
    pub player_name: String,
    /// Accumulated score.
    pub score: u32,
}

/// Final outcome computed when a game ends.
#[derive(Debug, Clone)]
pub struct FinalResults {
    /// Every player's final score, sorted score-descending (stable).
    pub final_scores: Vec<ScoreLine>,
    /// Every player whose score equals the maximum.
    pub winners: Vec<ScoreLine>,
    /// True when more than one player shares the top score.
    pub is_tie: bool,
    /// Wall-clock duration of the game in milliseconds.
    pub duration_ms: u64,
    /// Start timestamp in milliseconds since the Unix epoch.
    pub started_at_ms: u64,
    /// End timestamp in milliseconds since the Unix epoch.
    pub ended_at_ms: u64,
}

/// Reject structurally unusable questions before play begins.
///
/// A precondition check, not part of normal play: an empty id or text, an
/// empty option list, or an answer key pointing outside the options make the
/// question unplayable.
pub fn validate_questions(questions: &[Question]) -> Result<(), GameError> {
    for (index, question) in questions.iter().enumerate() {
        if question.id.is_empty() {
            return Err(GameError::InvalidQuestionFormat(format!(
                "question #{index} has an empty id"
            )));
        }
        if question.text.is_empty() {
            return Err(GameError::InvalidQuestionFormat(format!(
                "question `{}` has empty text",
                question.id
            )));
        }
        if question.options.is_empty() {
            return Err(GameError::InvalidQuestionFormat(format!(
                "question `{}` has no options",
                question.id
            )));
        }
        if question.correct_option_index >= question.options.len() {
            return Err(GameError::InvalidQuestionFormat(format!(
                "question `{}` has an out-of-range answer key",
                question.id
            )));
        }
    }
    Ok(())
}

/// The per-session state machine: `not-started -> playing -> finished`.
///
/// Owns an independent copy of the roster so room-level and game-level
/// mutation cannot alias; scores live on this copy during play and are the
/// authoritative source when a round ends.
#[derive(Debug, Clone)]
pub struct GameEngine {
    questions: Vec<Question>,
    players: IndexMap<Uuid, Player>,
    current_index: usize,
    started: bool,
    finished: bool,
    started_at_ms: Option<u64>,
    ended_at_ms: Option<u64>,
    first_correct: Option<Uuid>,
}

impl GameEngine {
    /// Build an engine over an immutable question list and a snapshot of the roster.
    ///
    /// Scores and per-question flags are reset on the copy; the connected
    /// flags start out true and are maintained by the coordinator as players
    /// depart mid-game.
    pub fn new(questions: Vec<Question>, roster: &IndexMap<Uuid, Player>) -> Self {
        let players = roster
            .values()
            .map(|player| {
                let mut copy = Player::new(player.id, player.name.clone(), player.is_host);
                copy.connected = player.connected;
                (player.id, copy)
            })
            .collect();

        Self {
            questions,
            players,
            current_index: 0,
            started: false,
            finished: false,
            started_at_ms: None,
            ended_at_ms: None,
            first_correct: None,
        }
    }

    /// Whether `start` has been called.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Whether the game reached its terminal state.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Index of the question currently in play.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The roster copy owned by this engine.
    pub fn players(&self) -> &IndexMap<Uuid, Player> {
        &self.players
    }

    /// Whether the roster contains the given player.
    pub fn has_player(&self, player_id: Uuid) -> bool {
        self.players.contains_key(&player_id)
    }

    /// Record that a player's connection dropped; their score is retained.
    pub fn mark_disconnected(&mut self, player_id: Uuid) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = false;
        }
    }

    /// True when every currently-connected player has answered the current question.
    ///
    /// Counts connected players only, so a departed player can never stall
    /// the reveal; returns false when nobody is connected at all.
    pub fn all_connected_answered(&self) -> bool {
        let mut any_connected = false;
        for player in self.players.values() {
            if player.connected {
                any_connected = true;
                if !player.has_answered {
                    return false;
                }
            }
        }
        any_connected
    }

    /// Transition to playing and return the first question.
    pub fn start(&mut self) -> Result<ClientQuestion, GameError> {
        if self.started || self.finished {
            return Err(GameError::AlreadyStarted);
        }
        if self.questions.is_empty() {
            return Err(GameError::NoQuestions);
        }
        if self.players.is_empty() {
            return Err(GameError::NoPlayers);
        }
        validate_questions(&self.questions)?;

        self.started = true;
        self.started_at_ms = Some(unix_millis());
        Ok(self.client_question(0))
    }

    /// Register one player's answer to the current question.
    ///
    /// A second submission from the same player for the same question is
    /// rejected without touching any state. A correct answer awards
    /// [`BASE_POINTS`], plus [`FIRST_CORRECT_BONUS`] when no other player
    /// answered the current question correctly first.
    pub fn submit_answer(
        &mut self,
        player_id: Uuid,
        option_index: usize,
    ) -> Result<AnswerOutcome, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.finished {
            return Err(GameError::Finished);
        }

        let correct_index = self.questions[self.current_index].correct_option_index;
        let option_count = self.questions[self.current_index].options.len();

        let player = self
            .players
            .get_mut(&player_id)
            .ok_or(GameError::UnknownPlayer)?;
        if player.has_answered {
            return Err(GameError::AlreadyAnswered);
        }
        if option_index >= option_count {
            return Err(GameError::InvalidOptionIndex);
        }

        let first_slot_open = self.first_correct.is_none();
        player.has_answered = true;
        let is_correct = option_index == correct_index;
        let mut points_awarded = 0;
        if is_correct {
            points_awarded = BASE_POINTS;
            if first_slot_open {
                points_awarded += FIRST_CORRECT_BONUS;
            }
            player.score += points_awarded;
        }
        if is_correct && first_slot_open {
            self.first_correct = Some(player_id);
        }

        Ok(AnswerOutcome {
            is_correct,
            points_awarded,
        })
    }

    /// Advance to the next question, finishing the game when the set is exhausted.
    ///
    /// Resets every player's answered flag and the first-correct slot.
    pub fn next_question(&mut self) -> Result<Advance, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if self.finished {
            return Err(GameError::Finished);
        }

        for player in self.players.values_mut() {
            player.has_answered = false;
        }
        self.first_correct = None;
        self.current_index += 1;

        if self.current_index >= self.questions.len() {
            self.finished = true;
            self.ended_at_ms = Some(unix_millis());
            return Ok(Advance {
                question: None,
                game_finished: true,
            });
        }

        Ok(Advance {
            question: Some(self.client_question(self.current_index)),
            game_finished: false,
        })
    }

    /// The question currently in play, stripped of its answer key.
    ///
    /// `None` before start and after finish.
    pub fn current_question(&self) -> Option<ClientQuestion> {
        if !self.started || self.finished {
            return None;
        }
        Some(self.client_question(self.current_index))
    }

    /// Answer key of the question currently in play, for round-result reveals.
    pub fn current_correct_index(&self) -> Option<usize> {
        if !self.started || self.current_index >= self.questions.len() {
            return None;
        }
        Some(self.questions[self.current_index].correct_option_index)
    }

    /// Scores sorted descending; equal scores preserve roster order (stable sort).
    pub fn leaderboard(&self) -> Vec<ScoreLine> {
        let mut lines: Vec<ScoreLine> = self
            .players
            .values()
            .map(|player| ScoreLine {
                player_id: player.id,
                player_name: player.name.clone(),
                score: player.score,
            })
            .collect();
        lines.sort_by(|a, b| b.score.cmp(&a.score));
        lines
    }

    /// Finish the game (if still running) and compute the final outcome.
    pub fn end_game(&mut self) -> Result<FinalResults, GameError> {
        if !self.started {
            return Err(GameError::NotStarted);
        }
        if !self.finished {
            self.finished = true;
            self.ended_at_ms = Some(unix_millis());
        }

        let final_scores = self.leaderboard();
        let top = final_scores.first().map(|line| line.score).unwrap_or(0);
        let winners: Vec<ScoreLine> = final_scores
            .iter()
            .filter(|line| line.score == top)
            .cloned()
            .collect();
        let is_tie = winners.len() > 1;

        let started_at_ms = self.started_at_ms.unwrap_or(0);
        let ended_at_ms = self.ended_at_ms.unwrap_or(started_at_ms);

        Ok(FinalResults {
            final_scores,
            winners,
            is_tie,
            duration_ms: ended_at_ms.saturating_sub(started_at_ms),
            started_at_ms,
            ended_at_ms,
        })
    }

    /// The immutable question list this engine plays.
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    fn client_question(&self, index: usize) -> ClientQuestion {
        let question = &self.questions[index];
        ClientQuestion {
            id: question.id.clone(),
            text: question.text.clone(),
            audio: question.audio.clone(),
            options: question.options.clone(),
            number: index + 1,
            total: self.questions.len(),
        }
    }
}
