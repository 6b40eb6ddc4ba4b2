//! Input validation for story requests.
//!
//! Bounds are generous — the aim is to reject empty or abusive inputs before
//! they reach a generation model, not to constrain creativity.

use crate::error::CoreError;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_THEME_LEN: usize = 200;
pub const MAX_CHOICE_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Validation functions
// ---------------------------------------------------------------------------

/// Validate a protagonist name: non-blank, at most [`MAX_NAME_LEN`] chars.
pub fn validate_protagonist_name(name: &str) -> Result<(), CoreError> {
    validate_text_field("protagonist_name", name, MAX_NAME_LEN)
}

/// Validate a protagonist description: non-blank, at most
/// [`MAX_DESCRIPTION_LEN`] chars.
pub fn validate_protagonist_description(description: &str) -> Result<(), CoreError> {
    validate_text_field("protagonist_description", description, MAX_DESCRIPTION_LEN)
}

/// Validate a story theme: non-blank, at most [`MAX_THEME_LEN`] chars.
pub fn validate_theme(theme: &str) -> Result<(), CoreError> {
    validate_text_field("theme", theme, MAX_THEME_LEN)
}

/// Validate a submitted choice: non-blank, at most [`MAX_CHOICE_LEN`] chars.
///
/// Free-typed choices are allowed, so this checks shape only — the text is
/// not required to match one of the offered choices.
pub fn validate_choice_text(choice: &str) -> Result<(), CoreError> {
    validate_text_field("choice_text", choice, MAX_CHOICE_LEN)
}

fn validate_text_field(field: &str, value: &str, max_len: usize) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(CoreError::Validation(format!(
            "{field} must be at most {max_len} characters, got {len}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
