//! Error types for the hosted backend client.

use reqwest::StatusCode;
use thiserror::Error;

/// Postgres error code for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Backend error type.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The auth provider rejected the request (bad credentials, expired refresh token).
    ///
    /// The message is the provider's own and is shown to the operator as-is.
    #[error("{0}")]
    Auth(String),

    /// The access token was missing, expired or revoked.
    #[error("Session expired. Please log in again.")]
    Unauthorized,

    /// The table API answered with an error body.
    #[error("Backend error ({status}): {message}")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response whose body did not match the expected shape.
    #[error("Failed to decode backend response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether this is the backend's uniqueness-violation error.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, BackendError::Api { code: Some(code), .. } if code == UNIQUE_VIOLATION)
    }
}

/// Result type alias for backend calls.
pub type Result<T, E = BackendError> = std::result::Result<T, E>;
