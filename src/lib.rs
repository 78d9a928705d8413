// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strive-Sync: durable Strava access for client applications
//!
//! This crate manages the Strava OAuth2 credential lifecycle (authorize,
//! exchange, refresh, persist, revoke), wraps the Strava REST API behind
//! automatic token refresh, and decodes Strava's encoded polylines.

pub mod config;
pub mod error;
pub mod models;
pub mod polyline;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

pub use config::Config;
pub use error::{Error, Result};
pub use services::{StravaService, TokenManager};
pub use store::CredentialStore;
