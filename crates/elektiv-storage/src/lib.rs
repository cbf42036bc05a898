//! Credential storage for the elektiv client.
//!
//! The browser original keeps its token pair in `localStorage` under fixed
//! keys. This crate provides the native equivalent: a `CredentialStorage`
//! trait over string key/value pairs, a JSON-file-backed implementation, and
//! a typed `SessionVault` that stores and clears the session as a unit.

mod file;
mod keys;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use traits::CredentialStorage;
pub use vault::{SessionMeta, SessionVault, UserType};

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
