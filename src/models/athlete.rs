// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava athlete profile and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated athlete profile from `GET /athlete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub id: u64,
    pub firstname: String,
    pub lastname: String,
    pub username: Option<String>,
    /// Profile picture URL
    pub profile: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub sex: Option<String>,
    pub premium: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub follower_count: Option<u32>,
    pub friend_count: Option<u32>,
    /// "feet" or "meters"
    pub measurement_preference: Option<String>,
    pub ftp: Option<u32>,
    /// Kilograms
    pub weight: Option<f64>,
}

impl AthleteProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }

    /// "City, Country", skipping whichever parts are missing or blank.
    pub fn location_text(&self) -> String {
        [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Aggregate statistics from `GET /athletes/{id}/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteStats {
    /// Meters
    pub biggest_ride_distance: Option<f64>,
    /// Meters
    pub biggest_climb_elevation_gain: Option<f64>,
    pub recent_ride_totals: Option<ActivityTotals>,
    pub recent_run_totals: Option<ActivityTotals>,
    pub recent_swim_totals: Option<ActivityTotals>,
    pub ytd_ride_totals: Option<ActivityTotals>,
    pub ytd_run_totals: Option<ActivityTotals>,
    pub ytd_swim_totals: Option<ActivityTotals>,
    pub all_ride_totals: Option<ActivityTotals>,
    pub all_run_totals: Option<ActivityTotals>,
    pub all_swim_totals: Option<ActivityTotals>,
}

/// Totals for one sport over one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTotals {
    pub count: u32,
    /// Meters
    pub distance: f64,
    /// Seconds
    pub moving_time: u64,
    /// Seconds
    pub elapsed_time: u64,
    /// Meters
    pub elevation_gain: f64,
    pub achievement_count: Option<u32>,
}
