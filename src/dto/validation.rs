//! Validation helpers for client-supplied fields.

use validator::ValidationError;

use crate::state::rooms::ROOM_CODE_ALPHABET;

/// Maximum accepted length of a display name.
const NAME_MAX: usize = 32;
/// Maximum accepted length of a chat message.
const CHAT_MAX: usize = 500;

/// Validates a player display name: non-blank, at most 32 characters.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name must not be blank".into());
        return Err(err);
    }
    if name.chars().count() > NAME_MAX {
        let mut err = ValidationError::new("player_name_length");
        err.message =
            Some(format!("Player name must be at most {NAME_MAX} characters").into());
        return Err(err);
    }
    Ok(())
}

/// Validates a lobby chat message: non-blank, at most 500 characters.
pub fn validate_chat_message(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("chat_message_blank");
        err.message = Some("Chat message must not be blank".into());
        return Err(err);
    }
    if text.chars().count() > CHAT_MAX {
        let mut err = ValidationError::new("chat_message_length");
        err.message =
            Some(format!("Chat message must be at most {CHAT_MAX} characters").into());
        return Err(err);
    }
    Ok(())
}

/// Validates the shape of a room code: non-empty, drawn from the code alphabet.
///
/// Existence is checked separately against the directory; this only rejects
/// input that could never name a room.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || !code.bytes().all(|byte| ROOM_CODE_ALPHABET.contains(&byte)) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some(
            "Room code must use uppercase letters and digits, excluding 0, O, 1, and I".into(),
        );
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_player_name() {
        assert!(validate_player_name("alice").is_ok());
        assert!(validate_player_name("  bob  ").is_ok());
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name(&"x".repeat(33)).is_err());
        assert!(validate_player_name(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_validate_chat_message() {
        assert!(validate_chat_message("hello").is_ok());
        assert!(validate_chat_message("").is_err());
        assert!(validate_chat_message("   ").is_err());
        assert!(validate_chat_message(&"x".repeat(501)).is_err());
        assert!(validate_chat_message(&"x".repeat(500)).is_ok());
    }

    #[test]
    fn test_validate_room_code() {
        assert!(validate_room_code("ABC234").is_ok());
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("abc234").is_err()); // lowercase
        assert!(validate_room_code("ABC0OI").is_err()); // ambiguous characters
        assert!(validate_room_code("ABC 23").is_err()); // space
    }
}
