//! Common validation utilities.

use validator::ValidationError;

use crate::invite_code;

lazy_static::lazy_static! {
    /// Letters, digits, `_`, `-` and `.`.
    pub static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();
}

/// Maximum length of a username.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Validates a username: 1-64 characters of ASCII letters, digits, `_`, `-` or `.`.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let trimmed = username.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_USERNAME_LENGTH {
        let mut err = ValidationError::new("username_length");
        err.message = Some("Username must be between 1 and 64 characters".into());
        return Err(err);
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        let mut err = ValidationError::new("username_format");
        err.message =
            Some("Username may only contain letters, digits, '_', '-' and '.'".into());
        return Err(err);
    }

    Ok(())
}

/// Validates the shape of an invite code submitted for redemption.
pub fn validate_invite_code(code: &str) -> Result<(), ValidationError> {
    if invite_code::is_well_formed(code.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("invite_code_format");
        err.message = Some("Invite code must be 4-32 letters or digits".into());
        Err(err)
    }
}
