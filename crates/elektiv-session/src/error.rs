//! Error types for session management.

use elektiv_storage::StorageError;
use thiserror::Error;

/// Errors from session lifecycle operations.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Stored session was rejected: {0}")]
    SessionInvalid(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;
