// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types shared by the token manager, the Strava client and the
//! polyline decoder.

use crate::polyline::PolylineError;
use crate::store::StoreError;

/// Error type returned by every public operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected to Strava")]
    NotAuthenticated,

    #[error("Authorization was cancelled")]
    AuthorizationCancelled,

    #[error("Invalid authorization callback: {0}")]
    InvalidCallback(String),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Malformed polyline: {0}")]
    MalformedPolyline(#[from] PolylineError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// True if Strava rejected the bearer token (HTTP 401).
    ///
    /// Callers should force a refresh and retry once.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::UnexpectedStatus(401))
    }

    /// True if Strava rate-limited the request (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::UnexpectedStatus(429))
    }

    /// True if the user has to go through the authorization flow again.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated | Error::ExchangeFailed(_) | Error::UnexpectedStatus(401)
        )
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
