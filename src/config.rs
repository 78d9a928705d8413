// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava integration configuration loaded from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Strava OAuth authorization endpoint.
pub const STRAVA_AUTHORIZE_URL: &str = "https://www.strava.com/oauth/authorize";
/// Strava OAuth token endpoint (code exchange and refresh).
pub const STRAVA_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
/// Strava OAuth deauthorization endpoint.
pub const STRAVA_DEAUTHORIZE_URL: &str = "https://www.strava.com/oauth/deauthorize";
/// Strava REST API base.
pub const STRAVA_API_BASE_URL: &str = "https://www.strava.com/api/v3";

/// Minimum read-only scope needed to list and read activities.
pub const DEFAULT_SCOPE: &str = "activity:read_all";
pub const DEFAULT_APPROVAL_PROMPT: &str = "auto";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CREDENTIALS_PATH: &str = ".strive/credentials.json";

/// Strava integration configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- OAuth application ---
    /// Strava OAuth client ID (public)
    pub client_id: String,
    /// Strava OAuth client secret. Never logged; `Debug` redacts it.
    pub client_secret: String,
    /// Must exactly match the callback registered with Strava
    pub redirect_uri: String,
    pub scope: String,
    /// "auto" or "force"
    pub approval_prompt: String,
    /// Redirect scheme to wait for, when it differs from `redirect_uri`'s
    pub callback_scheme: Option<String>,

    // --- Endpoints (overridable for tests) ---
    pub authorize_url: String,
    pub token_url: String,
    pub deauthorize_url: String,
    pub api_base_url: String,

    // --- Runtime ---
    /// Upper bound for every outbound HTTP request
    pub request_timeout: Duration,
    /// Location of the file credential store used by the CLI
    pub credentials_path: PathBuf,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            client_id: "test_client_id".to_string(),
            client_secret: "test_secret".to_string(),
            redirect_uri: "http://localhost:8765/callback".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            approval_prompt: DEFAULT_APPROVAL_PROMPT.to_string(),
            callback_scheme: None,
            authorize_url: STRAVA_AUTHORIZE_URL.to_string(),
            token_url: STRAVA_TOKEN_URL.to_string(),
            deauthorize_url: STRAVA_DEAUTHORIZE_URL.to_string(),
            api_base_url: STRAVA_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("approval_prompt", &self.approval_prompt)
            .field("callback_scheme", &self.callback_scheme)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("deauthorize_url", &self.deauthorize_url)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("credentials_path", &self.credentials_path)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let request_timeout = match env::var("STRAVA_REQUEST_TIMEOUT_SECS") {
            Ok(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid("STRAVA_REQUEST_TIMEOUT_SECS", v))?,
            Err(_) => defaults.request_timeout,
        };

        Ok(Self {
            client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            redirect_uri: env::var("STRAVA_REDIRECT_URI")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_REDIRECT_URI"))?,
            scope: env::var("STRAVA_SCOPE").unwrap_or(defaults.scope),
            approval_prompt: env::var("STRAVA_APPROVAL_PROMPT").unwrap_or(defaults.approval_prompt),
            callback_scheme: env::var("STRAVA_CALLBACK_SCHEME")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            authorize_url: defaults.authorize_url,
            token_url: defaults.token_url,
            deauthorize_url: defaults.deauthorize_url,
            api_base_url: defaults.api_base_url,
            request_timeout,
            credentials_path: env::var("STRAVA_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.credentials_path),
        })
    }

    /// Point every Strava endpoint at `base` (a fake server in tests).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{}/oauth/authorize", base);
        self.token_url = format!("{}/oauth/token", base);
        self.deauthorize_url = format!("{}/oauth/deauthorize", base);
        self.api_base_url = format!("{}/api/v3", base);
        self
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
