// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the Strava integration.

pub mod activity;
pub mod athlete;
pub mod credentials;

pub use activity::{
    ActivityDetail, ActivityMap, ActivitySummary, Lap, PhotoSummary, SegmentEffort, Split,
};
pub use athlete::{ActivityTotals, AthleteProfile, AthleteStats};
pub use credentials::{CredentialRecord, TokenResponse};
