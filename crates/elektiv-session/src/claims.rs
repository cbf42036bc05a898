//! Access token claim decoding.
//!
//! The client only needs the `exp` claim to schedule proactive renewal, so
//! the payload is decoded without verifying the signature. The server remains
//! the sole authority on token validity.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors from decoding a token payload.
#[derive(Error, Debug)]
pub enum ClaimsError {
    #[error("Token is not a three-part JWT")]
    Malformed,

    #[error("Token payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Claims carried in an access token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Expiry timestamp (seconds since the epoch)
    pub exp: i64,
    /// Issued-at timestamp
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Decode the claims of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_header), Some(payload), Some(_signature), None) => payload,
        _ => return Err(ClaimsError::Malformed),
    };

    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Extract the expiry of a token as a UTC timestamp.
///
/// Returns `None` when the token cannot be decoded; callers fall back to
/// reactive (401-driven) refresh in that case.
pub fn expiry(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(token).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}
