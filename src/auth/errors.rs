//! Authentication error types.

use thiserror::Error;

use crate::federated::FederatedError;
use crate::jwt::JwtError;
use crate::password::PasswordError;

/// Failures of the authentication operations.
///
/// Messages shown to clients are chosen by the HTTP layer; the `Display`
/// text here is for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required input was missing or empty.
    #[error("{0}")]
    Validation(&'static str),
    #[error("No identity with that email")]
    UnknownEmail,
    #[error("Password does not match")]
    WrongPassword,
    /// No usable bearer token on a protected request.
    #[error("Access denied")]
    MissingBearer,
    /// Signature, expiry or token kind check failed.
    #[error("Invalid token ({0})")]
    InvalidToken(&'static str),
    /// A validly signed refresh token that is not in its identity's set.
    #[error("Refresh token reuse detected")]
    ReplayDetected,
    /// Token claims name an identity that does not exist.
    #[error("Identity not found")]
    NotFound,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Federated login failed: {0}")]
    Federated(#[from] FederatedError),
    #[error("Token issuance failed: {0}")]
    Issuance(#[from] JwtError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Treat an absent or empty input as missing.
pub fn required<'a>(value: Option<&'a str>, message: &'static str) -> Result<&'a str, AuthError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AuthError::Validation(message)),
    }
}
