use std::{fs, path::Path};

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use crate::state::engine::validate_questions;
use crate::state::game::Question;

/// On-disk shape of the question set document.
#[derive(Debug, Deserialize)]
struct QuestionBankDocument {
    questions: Vec<Question>,
}

/// Load and validate the configured question set.
///
/// Every room and the lobby play this one set; a missing, undecodable, or
/// structurally invalid document is fatal at boot.
pub fn load_questions(path: &Path) -> anyhow::Result<Vec<Question>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("cannot read question set at {}", path.display()))?;
    let document: QuestionBankDocument = serde_json::from_str(&contents)
        .with_context(|| format!("cannot decode question set at {}", path.display()))?;

    if document.questions.is_empty() {
        anyhow::bail!("question set at {} is empty", path.display());
    }
    validate_questions(&document.questions)
        .with_context(|| format!("question set at {} is invalid", path.display()))?;

    info!(
        path = %path.display(),
        count = document.questions.len(),
        "question set loaded"
    );
    Ok(document.questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn write_temp(tag: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("quiz-rally-bank-{tag}-{}.json", Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn valid_document_loads() {
        let path = write_temp(
            "valid",
            r#"{"questions":[{"id":"q1","text":"Capital of France?","options":["Paris","Lyon"],"correct_option_index":0}]}"#,
        );
        let questions = load_questions(&path).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, "q1");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_empty_and_invalid_documents_fail() {
        assert!(load_questions(Path::new("/nonexistent/questions.json")).is_err());

        let empty = write_temp("empty", r#"{"questions":[]}"#);
        assert!(load_questions(&empty).is_err());
        let _ = fs::remove_file(empty);

        let bad_key = write_temp(
            "badkey",
            r#"{"questions":[{"id":"q1","text":"?","options":["a"],"correct_option_index":3}]}"#,
        );
        assert!(load_questions(&bad_key).is_err());
        let _ = fs::remove_file(bad_key);
    }
}
