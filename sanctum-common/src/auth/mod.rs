//! Credential & token service
//!
//! Password hashing ([`password`]) and signed session tokens ([`token`]).
//! Neither half touches the database; callers in the API crate own storage.

pub mod password;
pub mod token;

pub use password::{HashCost, PasswordService};
pub use token::{Claims, InvalidToken, TokenService, DEV_TOKEN_SECRET, TOKEN_TTL_DAYS};

use crate::{Error, Result};

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 50;

/// Trim, lower-case and validate a username
///
/// Accepted names are 3-50 characters drawn from `[a-z0-9_.-]` after
/// normalization, so `"  Alice "` and `"alice"` name the same account.
pub fn normalize_username(raw: &str) -> Result<String> {
    let username = raw.trim().to_lowercase();

    if username.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }

    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(Error::InvalidInput(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LEN, MAX_USERNAME_LEN
        )));
    }

    let valid = username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'));
    if !valid {
        return Err(Error::InvalidInput(
            "Username may only contain letters, digits, '_', '.' and '-'".to_string(),
        ));
    }

    Ok(username)
}

/// Check the password policy (length only)
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
