//! Validation helpers for request payloads.

use validator::ValidationError;

use crate::dao::models::PHRASE_NAME_SUFFIX;

/// Longest object name accepted, matching a DNS label.
pub const MAX_NAME_LEN: usize = 63;
/// Longest game name, leaving room for the derived phrase record name.
pub const MAX_GAME_NAME_LEN: usize = MAX_NAME_LEN - PHRASE_NAME_SUFFIX.len();

/// Validates that `name` is a DNS label: lowercase alphanumerics and `-`,
/// starting and ending with an alphanumeric, at most 63 characters.
///
/// # Examples
///
/// ```ignore
/// validate_object_name("go-fish") // Ok
/// validate_object_name("Go-Fish") // Err - uppercase
/// validate_object_name("-fish")   // Err - leading dash
/// ```
pub fn validate_object_name(name: &str) -> Result<(), ValidationError> {
    check_name(name, MAX_NAME_LEN)
}

/// Same as [`validate_object_name`] with the shorter game name limit.
pub fn validate_game_name(name: &str) -> Result<(), ValidationError> {
    check_name(name, MAX_GAME_NAME_LEN)
}

/// Guesses must carry at least one non-whitespace character.
pub fn validate_guess_text(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut err = ValidationError::new("guess_empty");
        err.message = Some("Guess must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn check_name(name: &str, max: usize) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > max {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Name must be 1 to {max} characters (got {})", name.len()).into());
        return Err(err);
    }

    let allowed = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !allowed || name.starts_with('-') || name.ends_with('-') {
        let mut err = ValidationError::new("name_format");
        err.message = Some(
            "Name must contain only lowercase alphanumerics or '-' and start and end with an alphanumeric"
                .into(),
        );
        return Err(err);
    }

    Ok(())
}
