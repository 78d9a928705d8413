// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - OAuth lifecycle and Strava API access.

pub mod authorization;
pub mod loopback;
pub mod strava;
pub mod token_manager;

pub use authorization::{AuthorizationAgent, AuthorizationSession, CallbackOutcome};
pub use loopback::LoopbackAgent;
pub use strava::{ActivityQuery, StravaClient, StravaService};
pub use token_manager::TokenManager;
