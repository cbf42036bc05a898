//! Storage key constants.

/// Fixed storage keys used by the client.
pub struct StorageKeys;

impl StorageKeys {
    /// Access token (short-lived bearer credential)
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token (used only to mint new access tokens)
    pub const REFRESH_TOKEN: &'static str = "refresh_token";

    /// Session metadata (JSON)
    pub const SESSION_META: &'static str = "session_meta";
}
