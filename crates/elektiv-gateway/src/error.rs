//! Error types for API requests.

use elektiv_session::AuthError;
use thiserror::Error;

/// Errors from requests made through the gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Session error: {0}")]
    Auth(#[from] AuthError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request stayed unauthorized even after a token refresh.
    #[error("Request was not authorized")]
    Unauthorized,

    /// The session could not be refreshed and has been torn down.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("API error: HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;
