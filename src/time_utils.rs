// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Encode a timestamp as decimal epoch seconds (the persisted expiry format).
pub fn to_epoch_string(date: DateTime<Utc>) -> String {
    date.timestamp().to_string()
}

/// Parse decimal epoch seconds. Fractional seconds are truncated.
pub fn parse_epoch_string(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let secs = match value.parse::<i64>() {
        Ok(secs) => secs,
        Err(_) => value.parse::<f64>().ok().filter(|f| f.is_finite())?.trunc() as i64,
    };
    DateTime::from_timestamp(secs, 0)
}
