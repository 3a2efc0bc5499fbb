// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input shape checks for the auth endpoints and real-time channel names.
//!
//! These reject malformed input before it reaches the identity provider.
//! They are not a password policy; strength rules belong to the provider.

use regex::Regex;
use sessiongate_common::{LoginRequest, SignupRequest};
use std::sync::LazyLock;
use thiserror::Error;

const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

/// Private per-user channels; assigned by the handshake only
pub const RESERVED_CHANNEL_PREFIX: &str = "user:";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{3,30}$").unwrap());
static CHANNEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:-]{0,99}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid channel: {0}")]
    InvalidChannel(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}

/// Validate a username: 3 to 30 letters, digits or underscores
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "Username must be 3-30 letters, digits or underscores".to_string(),
        ));
    }
    Ok(username)
}

/// Validate that a password is present and bounded
pub fn validate_password(password: &str) -> ValidationResult<&str> {
    if password.is_empty() {
        return Err(ValidationError::InvalidPassword(
            "Password must not be empty".to_string(),
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "Password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(password)
}

/// Validate a channel name a client asks to join or leave
pub fn validate_channel_name(channel: &str) -> ValidationResult<&str> {
    if channel.starts_with(RESERVED_CHANNEL_PREFIX) {
        return Err(ValidationError::InvalidChannel(format!(
            "Channels prefixed with '{RESERVED_CHANNEL_PREFIX}' are reserved"
        )));
    }

    if !CHANNEL_REGEX.is_match(channel) {
        return Err(ValidationError::InvalidChannel(
            "Channel name must be 1-100 characters of letters, digits, '_', '.', ':' or '-'"
                .to_string(),
        ));
    }

    Ok(channel)
}

pub fn validate_signup(req: &SignupRequest) -> ValidationResult<()> {
    validate_email(&req.email)?;
    validate_username(&req.username)?;
    validate_password(&req.password)?;
    Ok(())
}

pub fn validate_login(req: &LoginRequest) -> ValidationResult<()> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    Ok(())
}
