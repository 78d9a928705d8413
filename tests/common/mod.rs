// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use strive_sync::config::Config;
use strive_sync::services::{StravaService, TokenManager};
use strive_sync::store::{keys, CredentialStore, MemoryCredentialStore};
use wiremock::MockServer;

pub const ACCESS_TOKEN: &str = "stored_access_token";
pub const REFRESH_TOKEN: &str = "stored_refresh_token";

/// Config with every endpoint pointed at `server`.
#[allow(dead_code)]
pub fn test_config(server: &MockServer) -> Config {
    Config::default().with_base_url(&server.uri())
}

/// Write a credential record straight into the store.
#[allow(dead_code)]
pub fn seed_record(store: &dyn CredentialStore, access: &str, refresh: &str, expires_at: DateTime<Utc>) {
    store.save(keys::ACCESS_TOKEN, access).unwrap();
    store.save(keys::REFRESH_TOKEN, refresh).unwrap();
    store
        .save(keys::EXPIRES_AT, &expires_at.timestamp().to_string())
        .unwrap();
}

/// Token manager backed by a memory store holding a record that expires
/// `expires_in` from now (negative for an already expired record).
#[allow(dead_code)]
pub fn test_manager(
    server: &MockServer,
    expires_in: Option<Duration>,
) -> (Arc<TokenManager>, MemoryCredentialStore) {
    manager_with_config(test_config(server), expires_in)
}

/// Like [`test_manager`], with a caller-supplied config.
#[allow(dead_code)]
pub fn manager_with_config(
    config: Config,
    expires_in: Option<Duration>,
) -> (Arc<TokenManager>, MemoryCredentialStore) {
    let store = MemoryCredentialStore::new();
    if let Some(expires_in) = expires_in {
        seed_record(&store, ACCESS_TOKEN, REFRESH_TOKEN, Utc::now() + expires_in);
    }
    let manager = TokenManager::new(config, Arc::new(store.clone())).unwrap();
    (Arc::new(manager), store)
}

/// Config pointing at a local port nothing listens on.
#[allow(dead_code)]
pub fn unreachable_config() -> Config {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    Config::default().with_base_url(&format!("http://{}", addr))
}

/// Strava service over [`test_manager`].
#[allow(dead_code)]
pub fn test_service(
    server: &MockServer,
    expires_in: Option<Duration>,
) -> (StravaService, MemoryCredentialStore) {
    let (manager, store) = test_manager(server, expires_in);
    (StravaService::new(manager), store)
}

/// A token endpoint body valid for the next six hours.
#[allow(dead_code)]
pub fn token_body(access: &str, refresh: &str) -> Value {
    let expires_at = Utc::now() + Duration::hours(6);
    json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_at": expires_at.timestamp(),
        "expires_in": 21600
    })
}
