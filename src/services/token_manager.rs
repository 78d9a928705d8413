// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth2 credential lifecycle for the connected Strava account.
//!
//! The manager is the only reader and writer of the credential record. All
//! reads and writes of the record happen under one async mutex, so a refresh
//! is never raced by another refresh, an exchange or a disconnect, and
//! callers that find an expired token while a refresh is running wait for it
//! and reuse its result.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{CredentialRecord, TokenResponse};
use crate::services::authorization::{AuthorizationAgent, AuthorizationSession, CallbackOutcome};
use crate::services::strava::StravaClient;
use crate::store::{keys, CredentialStore};
use crate::time_utils::{format_utc_rfc3339, parse_epoch_string, to_epoch_string};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use url::Url;

/// State guarded by the credential lock.
#[derive(Default)]
struct RefreshState {
    /// Sequence number of the current lock holder, bumped on every acquire.
    holder: u64,
    last_failure: Option<RefreshFailure>,
}

/// A failed refresh and the lock holder that ran it.
struct RefreshFailure {
    holder: u64,
    message: String,
}

/// Owns the Strava OAuth state machine and the persisted credential record.
pub struct TokenManager {
    config: Config,
    client: StravaClient,
    store: Arc<dyn CredentialStore>,
    /// Critical section for every credential read-modify-write.
    credential_lock: Mutex<RefreshState>,
    /// Copy of `RefreshState::holder`, readable without the lock.
    current_holder: AtomicU64,
}

impl TokenManager {
    /// Create a manager persisting credentials in `store`.
    pub fn new(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = StravaClient::new(&config)?;
        Ok(Self::with_client(config, client, store))
    }

    /// Create a manager sharing an existing HTTP client.
    pub fn with_client(config: Config, client: StravaClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            client,
            store,
            credential_lock: Mutex::new(RefreshState::default()),
            current_holder: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    // ─── Authorization ───────────────────────────────────────────────────────

    /// Build the Strava authorization URL. No network access.
    pub fn build_authorization_url(&self) -> Result<Url> {
        if self.config.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is empty".to_string()));
        }
        if self.config.redirect_uri.trim().is_empty() {
            return Err(Error::Config("redirect_uri is empty".to_string()));
        }

        // Strava expects the comma-separated scope list unescaped.
        let auth_url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&approval_prompt={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            self.config.scope.trim(),
            urlencoding::encode(&self.config.approval_prompt),
        );

        Url::parse(&auth_url).map_err(|e| Error::Config(format!("invalid authorization URL: {}", e)))
    }

    /// Start an authorization session (authorization URL plus `state`).
    pub fn begin_authorization(&self) -> Result<AuthorizationSession> {
        AuthorizationSession::new(
            self.build_authorization_url()?,
            &self.config.redirect_uri,
            self.config.callback_scheme.as_deref(),
        )
    }

    /// Run the full authorization flow through `agent` and store the tokens.
    pub async fn authorize(&self, agent: &dyn AuthorizationAgent) -> Result<()> {
        let session = self.begin_authorization()?;

        tracing::info!(
            client_id = %self.config.client_id,
            redirect_uri = %session.redirect_uri(),
            "Starting Strava authorization"
        );

        let callback = match agent.authenticate(&session).await {
            Ok(CallbackOutcome::Redirected(url)) => url,
            Ok(CallbackOutcome::Cancelled) => {
                tracing::info!("Strava authorization cancelled");
                return Err(Error::AuthorizationCancelled);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Authorization agent failed");
                return Err(e);
            }
        };

        let code = session
            .extract_code(&callback)
            .inspect_err(|e| tracing::warn!(error = %e, "Rejected Strava authorization callback"))?;

        self.exchange_code(&code).await
    }

    /// Exchange an authorization code for tokens and persist them.
    ///
    /// On any failure the stored record is left as it was.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let response = self.client.exchange_code(code).await.map_err(|e| {
            tracing::warn!(error = %e, "Strava token exchange failed");
            Error::ExchangeFailed(e.to_string())
        })?;

        let record = into_record(response).map_err(Error::ExchangeFailed)?;

        let _guard = self.lock_credentials().await;
        self.persist(&record)?;

        tracing::info!(
            expires_at = %format_utc_rfc3339(record.expires_at),
            "Strava authorization complete, tokens stored"
        );
        Ok(())
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a valid (non-expired) access token, refreshing if needed.
    ///
    /// Every outbound API call goes through here. If several callers find the
    /// token expired at once, only the first refreshes; the rest wait on the
    /// lock, then re-read the record (or share the refresh failure).
    pub async fn ensure_valid_access_token(&self) -> Result<String> {
        let (mut state, waited_behind) = self.lock_credentials_tracked().await;

        let record = self.load_record()?.ok_or(Error::NotAuthenticated)?;
        if record.is_valid_at(Utc::now()) {
            return Ok(record.access_token);
        }

        // A holder we queued behind (or one after it) failed to refresh and
        // nothing has succeeded since; don't repeat it.
        if let (Some(first), Some(failure)) = (waited_behind, &state.last_failure) {
            if failure.holder >= first {
                return Err(Error::RefreshFailed(failure.message.clone()));
            }
        }

        tracing::info!(
            expired_at = %format_utc_rfc3339(record.expires_at),
            "Strava access token expired, refreshing"
        );
        let refreshed = self.refresh_locked(&mut state, &record).await?;
        Ok(refreshed.access_token)
    }

    /// Refresh the access token now, whether or not it has expired.
    pub async fn refresh(&self) -> Result<()> {
        let mut state = self.lock_credentials().await;
        let record = self.load_record()?.ok_or(Error::NotAuthenticated)?;
        self.refresh_locked(&mut state, &record).await.map(|_| ())
    }

    /// True if a record exists and has not expired.
    pub async fn is_authorized(&self) -> bool {
        let _guard = self.lock_credentials().await;
        match self.load_record() {
            Ok(Some(record)) => record.is_valid_at(Utc::now()),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read Strava credentials");
                false
            }
        }
    }

    /// The stored record, if any. Its `Debug` output redacts the tokens.
    pub async fn credentials(&self) -> Result<Option<CredentialRecord>> {
        let _guard = self.lock_credentials().await;
        self.load_record()
    }

    /// Erase the stored record. Idempotent; store failures are logged.
    pub async fn disconnect(&self) {
        let _guard = self.lock_credentials().await;
        self.erase();
        tracing::info!("Strava credentials removed");
    }

    /// Deauthorize the app with Strava, then erase the local record.
    ///
    /// The local record is erased even if Strava rejects the request; the
    /// Strava error is still returned.
    pub async fn revoke(&self) -> Result<()> {
        let _guard = self.lock_credentials().await;

        let record = match self.load_record() {
            Ok(record) => record,
            Err(e) => {
                self.erase();
                return Err(e);
            }
        };

        let result = match record {
            Some(record) => {
                let access_token = self.token_for_revocation(record).await;
                self.client.deauthorize(&access_token).await
            }
            None => Ok(()),
        };

        self.erase();

        if let Err(e) = &result {
            tracing::warn!(error = %e, "Strava deauthorization failed, local credentials removed anyway");
        }
        result
    }

    // ─── Locking ─────────────────────────────────────────────────────────────

    async fn lock_credentials(&self) -> MutexGuard<'_, RefreshState> {
        self.lock_credentials_tracked().await.0
    }

    /// Take the credential lock. If it was held, also return the sequence
    /// number of the holder we queued behind (or an earlier one, if that
    /// holder had not yet published its number).
    async fn lock_credentials_tracked(&self) -> (MutexGuard<'_, RefreshState>, Option<u64>) {
        let seen = self.current_holder.load(Ordering::Acquire);
        let (mut state, waited_behind) = match self.credential_lock.try_lock() {
            Ok(state) => (state, None),
            Err(_) => (self.credential_lock.lock().await, Some(seen)),
        };

        state.holder += 1;
        self.current_holder.store(state.holder, Ordering::Release);
        (state, waited_behind)
    }

    // ─── Internals (credential lock held) ────────────────────────────────────

    /// Refresh with Strava and replace the stored record.
    async fn refresh_locked(
        &self,
        state: &mut RefreshState,
        record: &CredentialRecord,
    ) -> Result<CredentialRecord> {
        let result = self
            .client
            .refresh_token(&record.refresh_token)
            .await
            .map_err(|e| e.to_string())
            .and_then(into_record);

        let refreshed = match result {
            Ok(refreshed) => refreshed,
            Err(msg) => {
                tracing::warn!(error = %msg, "Strava token refresh failed");
                state.last_failure = Some(RefreshFailure {
                    holder: state.holder,
                    message: msg.clone(),
                });
                return Err(Error::RefreshFailed(msg));
            }
        };
        state.last_failure = None;

        self.persist(&refreshed)?;

        if refreshed.refresh_token != record.refresh_token {
            tracing::debug!("Strava rotated the refresh token");
        }
        tracing::info!(
            expires_at = %format_utc_rfc3339(refreshed.expires_at),
            "Strava token refreshed"
        );
        Ok(refreshed)
    }

    /// Best token for a deauthorize call: refreshed in memory if expired,
    /// otherwise (or if that fails) the stored one.
    async fn token_for_revocation(&self, record: CredentialRecord) -> String {
        if record.is_valid_at(Utc::now()) {
            return record.access_token;
        }

        tracing::info!("Token expired before revocation, refreshing in-memory");
        match self.client.refresh_token(&record.refresh_token).await {
            Ok(new_tokens) => new_tokens.access_token,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to refresh token for deauth (attempting with old token)"
                );
                record.access_token
            }
        }
    }

    /// Read the record. A partial or unreadable record counts as absent.
    fn load_record(&self) -> Result<Option<CredentialRecord>> {
        let access_token = self.store.read(keys::ACCESS_TOKEN)?;
        let refresh_token = self.store.read(keys::REFRESH_TOKEN)?;
        let expires_at = self.store.read(keys::EXPIRES_AT)?;

        match (access_token, refresh_token, expires_at) {
            (None, None, None) => Ok(None),
            (Some(access_token), Some(refresh_token), Some(expires_at)) => {
                match parse_epoch_string(&expires_at) {
                    Some(expires_at) => Ok(Some(CredentialRecord {
                        access_token,
                        refresh_token,
                        expires_at,
                    })),
                    None => {
                        tracing::warn!("Stored Strava expiry is unreadable, ignoring credentials");
                        Ok(None)
                    }
                }
            }
            _ => {
                tracing::warn!("Stored Strava credentials are incomplete, ignoring them");
                Ok(None)
            }
        }
    }

    /// Write all three entries. If a write fails the entries are erased so
    /// no mixed old/new record survives.
    fn persist(&self, record: &CredentialRecord) -> Result<()> {
        let expires_at = to_epoch_string(record.expires_at);
        let writes = [
            (keys::ACCESS_TOKEN, record.access_token.as_str()),
            (keys::REFRESH_TOKEN, record.refresh_token.as_str()),
            (keys::EXPIRES_AT, expires_at.as_str()),
        ];

        for (key, value) in writes {
            if let Err(e) = self.store.save(key, value) {
                tracing::error!(key, error = %e, "Failed to store Strava credentials");
                self.erase();
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn erase(&self) {
        for key in keys::ALL {
            if let Err(e) = self.store.delete(key) {
                tracing::warn!(key, error = %e, "Failed to delete stored credential");
            }
        }
    }
}

/// Validate a token endpoint response into a record.
fn into_record(response: TokenResponse) -> std::result::Result<CredentialRecord, String> {
    response
        .into_record()
        .ok_or_else(|| "expires_at out of range".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    fn manager(config: Config) -> TokenManager {
        TokenManager::new(config, Arc::new(MemoryCredentialStore::new())).unwrap()
    }

    #[test]
    fn test_authorization_url_params() {
        let config = Config {
            client_id: "abc".to_string(),
            redirect_uri: "https://example.com/cb".to_string(),
            scope: "activity:read_all".to_string(),
            ..Config::default()
        };
        let url = manager(config).build_authorization_url().unwrap();
        let query = url.query().unwrap();

        assert!(url.as_str().starts_with("https://www.strava.com/oauth/authorize?"));
        assert!(query.contains("client_id=abc"));
        assert!(query.contains("redirect_uri=https%3A%2F%2Fexample.com%2Fcb"));
        assert!(query.contains("response_type=code"));
        assert!(query.contains("scope=activity:read_all"));
        assert!(query.contains("approval_prompt=auto"));
    }

    #[test]
    fn test_authorization_url_is_deterministic() {
        let m = manager(Config::default());
        assert_eq!(
            m.build_authorization_url().unwrap(),
            m.build_authorization_url().unwrap()
        );
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        let config = Config {
            client_id: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            manager(config).build_authorization_url(),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_record_counts_as_absent() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.save(keys::ACCESS_TOKEN, "orphan").unwrap();
        let m = TokenManager::new(Config::default(), store).unwrap();

        assert!(!m.is_authorized().await);
        assert!(matches!(
            m.ensure_valid_access_token().await,
            Err(Error::NotAuthenticated)
        ));
    }

    /// Manager holding an expired record, with Strava at a port nothing
    /// listens on so any refresh attempt fails with a transport error.
    fn expired_manager() -> TokenManager {
        let store = Arc::new(MemoryCredentialStore::new());
        store.save(keys::ACCESS_TOKEN, "expired").unwrap();
        store.save(keys::REFRESH_TOKEN, "refresh").unwrap();
        store
            .save(keys::EXPIRES_AT, &to_epoch_string(Utc::now() - chrono::Duration::hours(1)))
            .unwrap();

        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let config = Config::default().with_base_url(&format!("http://{}", addr));
        TokenManager::new(config, store).unwrap()
    }

    #[tokio::test]
    async fn test_waiter_shares_failure_recorded_before_release() {
        let m = Arc::new(expired_manager());

        // A holder whose refresh already failed, but which has not released yet.
        let mut state = m.lock_credentials().await;
        state.last_failure = Some(RefreshFailure {
            holder: state.holder,
            message: "invalid_grant".to_string(),
        });

        let waiter = tokio::spawn({
            let m = Arc::clone(&m);
            async move { m.ensure_valid_access_token().await }
        });
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        drop(state);

        match waiter.await.unwrap() {
            Err(Error::RefreshFailed(msg)) => assert_eq!(msg, "invalid_grant"),
            other => panic!("expected the shared failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_later_caller_retries_after_failure() {
        let m = expired_manager();

        {
            let mut state = m.lock_credentials().await;
            state.last_failure = Some(RefreshFailure {
                holder: state.holder,
                message: "invalid_grant".to_string(),
            });
        }

        // The lock was free on arrival, so this caller makes its own attempt.
        match m.ensure_valid_access_token().await {
            Err(Error::RefreshFailed(msg)) => assert_ne!(msg, "invalid_grant"),
            other => panic!("expected a fresh refresh failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_unreadable_expiry_counts_as_absent() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.save(keys::ACCESS_TOKEN, "a").unwrap();
        store.save(keys::REFRESH_TOKEN, "r").unwrap();
        store.save(keys::EXPIRES_AT, "tomorrow").unwrap();
        let m = TokenManager::new(Config::default(), store).unwrap();

        assert!(m.credentials().await.unwrap().is_none());
    }
}
