//! Error types for authgate.

use thiserror::Error;

/// Common error type for authgate operations.
///
/// Recoverable authentication outcomes (wrong password, unknown user, stale
/// remember cookie) are *not* errors; operations report them as `Ok(None)` so
/// callers can render a login form. This type covers the conditions that
/// abort an operation: storage failures, invalid tokens, and configuration
/// mistakes.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Credential store error.
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    /// Password hashing error.
    #[error("password error: {0}")]
    Password(#[from] crate::hash::PasswordError),

    /// Login token error, including tampered or undecryptable tokens.
    #[error("token error: {0}")]
    Token(#[from] crate::token::TokenError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for authgate operations.
pub type Result<T> = std::result::Result<T, AuthError>;
