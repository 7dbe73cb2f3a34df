//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement.

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: country, device, username, person names
pub const MAX_NAME_LEN: usize = 200;

/// Long free text: problem description, feedback fields
pub const MAX_NOTE_LEN: usize = 5000;

/// Short identifiers: external code, serial, VIN, year, version
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Passwords (before hashing)
pub const MAX_PASSWORD_LEN: usize = 128;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty"))
            .with_detail("field", field));
    }
    validate_text_len(value, field, max_len)
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    match value {
        Some(v) => validate_text_len(v, field, max_len),
        None => Ok(()),
    }
}

/// Validate a possibly empty string against the length limit.
pub fn validate_text_len(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    let len = value.chars().count();
    if len > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        ))
        .with_detail("field", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank() {
        let err = validate_required_text("   ", "name", MAX_NAME_LEN).unwrap_err();
        assert_eq!(err.details.unwrap().get("field").unwrap(), "name");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let value = "é".repeat(MAX_SHORT_TEXT_LEN);
        assert!(validate_required_text(&value, "serial", MAX_SHORT_TEXT_LEN).is_ok());
        let value = Some("x".repeat(MAX_SHORT_TEXT_LEN + 1));
        assert!(validate_optional_text(&value, "serial", MAX_SHORT_TEXT_LEN).is_err());
        assert!(validate_optional_text(&None, "serial", MAX_SHORT_TEXT_LEN).is_ok());
    }
}
