//! High-level API for storing and clearing the session.

use crate::{CredentialStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};

/// Margin before the recorded expiry at which the session already counts as
/// expired, to absorb clock skew between client and server.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Role of the authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Student,
    Admin,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserType::Student => write!(f, "student"),
            UserType::Admin => write!(f, "admin"),
        }
    }
}

/// Session metadata stored alongside the token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Display name of the user
    pub full_name: String,
    /// Role of the user
    pub user_type: UserType,
    /// Student index number, if the user has filled the form
    #[serde(default)]
    pub index: Option<String>,
    /// When the access token expires (RFC3339), if the token could be decoded
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Typed wrapper over a credential storage backend.
///
/// Tokens and metadata are always written and cleared together: the vault
/// never holds a refresh token without an access token or vice versa.
pub struct SessionVault {
    storage: Box<dyn CredentialStorage>,
}

impl SessionVault {
    /// Create a new vault with the given storage backend.
    pub fn new(storage: Box<dyn CredentialStorage>) -> Self {
        Self { storage }
    }

    /// Retrieve the access token.
    pub fn access_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::ACCESS_TOKEN)
    }

    /// Retrieve the refresh token.
    pub fn refresh_token(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::REFRESH_TOKEN)
    }

    /// Replace the access token after a refresh.
    pub fn set_access_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, token)
    }

    /// Replace the refresh token when the backend rotates it.
    pub fn set_refresh_token(&self, token: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::REFRESH_TOKEN, token)
    }

    /// Retrieve the session metadata.
    pub fn session_meta(&self) -> StorageResult<Option<SessionMeta>> {
        match self.storage.get(StorageKeys::SESSION_META)? {
            Some(json) => {
                let meta: SessionMeta = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// Store the session metadata.
    pub fn set_session_meta(&self, meta: &SessionMeta) -> StorageResult<()> {
        let json =
            serde_json::to_string(meta).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(StorageKeys::SESSION_META, &json)
    }

    /// Store a complete session (both tokens plus metadata).
    pub fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        meta: &SessionMeta,
    ) -> StorageResult<()> {
        self.storage.set(StorageKeys::ACCESS_TOKEN, access_token)?;
        self.storage.set(StorageKeys::REFRESH_TOKEN, refresh_token)?;
        self.set_session_meta(meta)
    }

    /// Check if a session exists (token and metadata both present).
    pub fn has_session(&self) -> StorageResult<bool> {
        let has_token = self.storage.has(StorageKeys::ACCESS_TOKEN)?;
        let has_meta = self.storage.has(StorageKeys::SESSION_META)?;
        Ok(has_token && has_meta)
    }

    /// Check if the stored session is expired.
    ///
    /// A session with no recorded expiry is treated as not expired; the
    /// 401-driven refresh path covers it.
    pub fn is_session_expired(&self) -> StorageResult<bool> {
        let meta = match self.session_meta()? {
            Some(m) => m,
            None => return Ok(true),
        };

        let expires_at = match meta.expires_at {
            Some(ts) => ts,
            None => return Ok(false),
        };

        let expires_at = chrono::DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let remaining = expires_at
            .signed_duration_since(chrono::Utc::now())
            .num_seconds();
        Ok(remaining < EXPIRY_SKEW_SECONDS)
    }

    /// Clear the session. Idempotent.
    pub fn clear_session(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let _ = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        let _ = self.storage.delete(StorageKeys::SESSION_META);
        Ok(())
    }
}
