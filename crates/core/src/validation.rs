//! Input validation utilities.
//!
//! Account fields are checked here before they touch the filesystem: a username becomes a
//! directory name, so it is held to a conservative ASCII set.

use crate::{GuardianError, GuardianResult};

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_EMAIL_LEN: usize = 254;

/// Validates that a username is safe to use as a single path component.
///
/// - Rejects empty or whitespace-only strings
/// - Bounds the length to [`MAX_USERNAME_LEN`]
/// - Restricts characters to ASCII alphanumerics, `.`, `-` and `_`
/// - Rejects a leading `.` so `.` and `..` can never be produced
///
/// # Errors
///
/// Returns a `GuardianError::InvalidInput` if the username is invalid.
pub fn validate_username(username: &str) -> GuardianResult<()> {
    if username.trim().is_empty() {
        return Err(GuardianError::InvalidInput("username cannot be empty".into()));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(GuardianError::InvalidInput(format!(
            "username exceeds maximum length of {} characters",
            MAX_USERNAME_LEN
        )));
    }

    let ok = username
        .bytes()
        .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

    if !ok {
        return Err(GuardianError::InvalidInput(
            "username contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
                .into(),
        ));
    }

    if username.starts_with('.') {
        return Err(GuardianError::InvalidInput(
            "username cannot start with '.'".into(),
        ));
    }

    Ok(())
}

/// Minimal email sanity check: something on both sides of a single `@`, no whitespace.
pub fn validate_email(email: &str) -> GuardianResult<()> {
    let invalid = || GuardianError::InvalidInput(format!("invalid email address: '{}'", email));

    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(invalid()),
    }
}

pub fn validate_password(password: &str) -> GuardianResult<()> {
    if password.is_empty() {
        return Err(GuardianError::InvalidInput("password cannot be empty".into()));
    }
    Ok(())
}
