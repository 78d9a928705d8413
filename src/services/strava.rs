// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching activities and athlete data.
//!
//! Handles:
//! - Token endpoint calls (code exchange, refresh, deauthorization)
//! - Authenticated GETs with typed JSON decoding
//! - Status mapping (rate limits and rejected tokens are logged)

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    ActivityDetail, ActivitySummary, AthleteProfile, AthleteStats, TokenResponse,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Strava's documented maximum page size for list endpoints.
pub const MAX_PER_PAGE: u32 = 200;

/// Strava API client. Stateless apart from the connection pool.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    deauthorize_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials and endpoints from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token_url: config.token_url.clone(),
            deauthorize_url: config.deauthorize_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    // ─── Data Endpoints ──────────────────────────────────────────────────────

    /// Get a detailed activity by ID.
    pub async fn get_activity(
        &self,
        access_token: &str,
        activity_id: u64,
    ) -> Result<ActivityDetail> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);
        self.get_json(&url, access_token, &[]).await
    }

    /// List the athlete's activities, newest first.
    pub async fn list_activities(
        &self,
        access_token: &str,
        query: &ActivityQuery,
    ) -> Result<Vec<ActivitySummary>> {
        let url = format!("{}/athlete/activities", self.base_url);
        self.get_json(&url, access_token, &query.to_params()).await
    }

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self, access_token: &str) -> Result<AthleteProfile> {
        let url = format!("{}/athlete", self.base_url);
        self.get_json(&url, access_token, &[]).await
    }

    /// Get aggregate stats for an athlete.
    pub async fn get_athlete_stats(
        &self,
        access_token: &str,
        athlete_id: u64,
    ) -> Result<AthleteStats> {
        let url = format!("{}/athletes/{}/stats", self.base_url, athlete_id);
        self.get_json(&url, access_token, &[]).await
    }

    // ─── Token Endpoint ──────────────────────────────────────────────────────

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        self.post_token(&[
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// Deauthorize the application for the user.
    ///
    /// This invalidates all access and refresh tokens for the user
    /// and removes the app from their Strava settings.
    pub async fn deauthorize(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.deauthorize_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::check_response(response).await?;
        tracing::info!("Strava deauthorization successful");
        Ok(())
    }

    // ─── Helpers ─────────────────────────────────────────────────────────────

    /// Form-encoded POST to the token endpoint.
    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(&self.token_url).form(form).send().await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        // Data endpoints answer 200 with a body; other 2xx codes are not data.
        let status = response.status();
        if status.is_success() && status != StatusCode::OK {
            tracing::warn!(status = %status, url, "Unexpected Strava success status");
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        let response = Self::check_response(response).await?;
        Self::parse_json(response).await
    }

    /// Check response status and return error if not successful.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => tracing::warn!("Strava rate limit hit (429)"),
            401 => tracing::info!(body = %body, "Strava rejected the access token (401)"),
            _ => tracing::warn!(status = %status, body = %body, "Strava request failed"),
        }

        Err(Error::UnexpectedStatus(status.as_u16()))
    }

    /// Read the body and decode it. Body read failures are transport errors;
    /// shape mismatches are malformed responses.
    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::MalformedResponse(format!("JSON parse error: {}", e)))
    }
}

/// Query for the activity list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Clamped to `1..=MAX_PER_PAGE`
    pub per_page: Option<u32>,
    /// Only activities before this epoch second
    pub before: Option<i64>,
    /// Only activities after this epoch second
    pub after: Option<i64>,
}

impl ActivityQuery {
    /// The `count` most recent activities (at most one page).
    pub fn recent(count: u32) -> Self {
        Self {
            per_page: Some(count),
            ..Self::default()
        }
    }

    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(before) = self.before {
            params.push(("before", before.to_string()));
        }
        if let Some(after) = self.after {
            params.push(("after", after.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.max(1).to_string()));
        }
        if let Some(per_page) = self.per_page {
            params.push(("per_page", per_page.clamp(1, MAX_PER_PAGE).to_string()));
        }
        params
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

use crate::services::token_manager::TokenManager;

/// High-level Strava service: every call first obtains a valid access token
/// from the shared [`TokenManager`], then goes through [`StravaClient`].
///
/// Holds no mutable state of its own; clone freely across tasks.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    tokens: Arc<TokenManager>,
}

impl StravaService {
    pub fn new(tokens: Arc<TokenManager>) -> Self {
        Self {
            client: tokens.client().clone(),
            tokens,
        }
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// The `count` most recent activities. `count` is capped at 200;
    /// zero returns an empty list without touching the network.
    pub async fn fetch_recent_activities(&self, count: u32) -> Result<Vec<ActivitySummary>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        self.fetch_activities(&ActivityQuery::recent(count)).await
    }

    /// List activities (paginated).
    pub async fn fetch_activities(&self, query: &ActivityQuery) -> Result<Vec<ActivitySummary>> {
        let access_token = self.tokens.ensure_valid_access_token().await?;
        let activities = self.client.list_activities(&access_token, query).await?;
        tracing::debug!(count = activities.len(), "Fetched Strava activities");
        Ok(activities)
    }

    /// Get a detailed activity by ID.
    pub async fn fetch_detailed_activity(&self, activity_id: u64) -> Result<ActivityDetail> {
        let access_token = self.tokens.ensure_valid_access_token().await?;
        self.client.get_activity(&access_token, activity_id).await
    }

    /// Get the connected athlete's profile.
    pub async fn fetch_athlete_profile(&self) -> Result<AthleteProfile> {
        let access_token = self.tokens.ensure_valid_access_token().await?;
        self.client.get_athlete(&access_token).await
    }

    /// Get aggregate stats for `athlete_id`.
    pub async fn fetch_athlete_stats(&self, athlete_id: u64) -> Result<AthleteStats> {
        let access_token = self.tokens.ensure_valid_access_token().await?;
        self.client
            .get_athlete_stats(&access_token, athlete_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_query_params() {
        assert_eq!(
            ActivityQuery::recent(10).to_params(),
            vec![("per_page", "10".to_string())]
        );
    }

    #[test]
    fn test_per_page_clamped() {
        assert_eq!(
            ActivityQuery::recent(5000).to_params(),
            vec![("per_page", "200".to_string())]
        );
    }

    #[test]
    fn test_full_query_params() {
        let query = ActivityQuery {
            page: Some(0),
            per_page: Some(30),
            before: Some(1_700_000_000),
            after: Some(1_600_000_000),
        };

        assert_eq!(
            query.to_params(),
            vec![
                ("before", "1700000000".to_string()),
                ("after", "1600000000".to_string()),
                ("page", "1".to_string()),
                ("per_page", "30".to_string()),
            ]
        );
    }
}
