// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth credential record and token endpoint response.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// The persisted Strava credentials for the connected account.
///
/// Replaced as a whole on every refresh, never merged.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// True while `now` is strictly before the expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token response from Strava (code exchange and refresh).
///
/// The exchange response also carries an athlete summary, which is ignored.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, epoch seconds
    pub expires_at: i64,
}

impl TokenResponse {
    /// Convert into a credential record. `None` if `expires_at` is out of range.
    pub fn into_record(self) -> Option<CredentialRecord> {
        let expires_at = DateTime::from_timestamp(self.expires_at, 0)?;
        Some(CredentialRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}
