//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] solarshop_core::EmailError),

    /// Invalid phone number.
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] solarshop_core::PhoneNumberError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login attempted before the email was verified.
    #[error("email not verified")]
    EmailNotVerified,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A required profile field is missing.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Verification code is wrong, unknown or already used.
    #[error("invalid verification code")]
    InvalidCode,

    /// Verification code has expired.
    #[error("verification code expired")]
    CodeExpired,

    /// Too many wrong guesses for the current code.
    #[error("too many verification attempts")]
    TooManyAttempts,

    /// Reset token is unknown, used or expired.
    #[error("invalid or expired reset token")]
    InvalidToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
