// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential persistence.
//!
//! The token manager persists its credential record as plain string entries
//! through the [`CredentialStore`] capability. Implementations only need
//! atomic single-key operations.

pub mod file;
pub mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

/// Store keys for the persisted credential record.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "strava_access_token";
    pub const REFRESH_TOKEN: &str = "strava_refresh_token";
    /// Expiry as decimal epoch seconds
    pub const EXPIRES_AT: &str = "strava_expires_at";

    pub const ALL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, EXPIRES_AT];
}

/// Key/value capability with at most one value per key.
pub trait CredentialStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Read the value under `key`, if any.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Credential store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt credential file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
