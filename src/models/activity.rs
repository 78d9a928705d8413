// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava activity records as returned by the REST API.
//!
//! Only `id` and `start_date` are required. Everything else is optional on
//! the wire and decodes to `None` when absent or null, never to zero.

use crate::polyline::{self, Coordinate, PolylineError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: u64,
    pub name: Option<String>,
    /// Legacy activity type ("Ride", "Run", ...)
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    /// Fine-grained sport type ("VirtualRide", "GravelRide", ...)
    pub sport_type: Option<String>,
    /// Distance in meters
    pub distance: Option<f64>,
    /// Seconds
    pub moving_time: Option<u64>,
    /// Seconds
    pub elapsed_time: Option<u64>,
    /// Meters
    pub total_elevation_gain: Option<f64>,
    pub start_date: DateTime<Utc>,
    /// Wall-clock start time in the activity's timezone. Strava labels it
    /// with a `Z` suffix even though it is not UTC.
    pub start_date_local: Option<DateTime<Utc>>,
    pub timezone: Option<String>,

    // --- Speed and effort ---
    /// Meters per second
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_cadence: Option<f64>,
    /// Celsius
    pub average_temp: Option<f64>,
    pub average_watts: Option<f64>,
    pub weighted_average_watts: Option<f64>,
    pub max_watts: Option<f64>,
    pub device_watts: Option<bool>,
    pub kilojoules: Option<f64>,
    pub has_heartrate: Option<bool>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub suffer_score: Option<f64>,

    // --- Flags and social ---
    pub commute: Option<bool>,
    pub trainer: Option<bool>,
    pub manual: Option<bool>,
    pub pr_count: Option<u32>,
    pub kudos_count: Option<u32>,
    pub achievement_count: Option<u32>,

    // --- Location ---
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    /// Strava sends `[]` for activities without GPS; that decodes to `None`.
    #[serde(
        default,
        deserialize_with = "deserialize_latlng",
        serialize_with = "serialize_latlng"
    )]
    pub start_latlng: Option<Coordinate>,
    #[serde(
        default,
        deserialize_with = "deserialize_latlng",
        serialize_with = "serialize_latlng"
    )]
    pub end_latlng: Option<Coordinate>,
    pub map: Option<ActivityMap>,
}

impl ActivitySummary {
    /// Get the detailed polyline, falling back to summary if not available.
    pub fn polyline(&self) -> Option<&str> {
        self.map.as_ref().and_then(ActivityMap::best_polyline)
    }

    /// Decode the activity's route. Activities without a map yield no points.
    pub fn coordinates(&self) -> Result<Vec<Coordinate>, PolylineError> {
        polyline::decode_optional(self.polyline())
    }
}

/// Activity map data with polylines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityMap {
    pub id: Option<String>,
    /// Full-resolution polyline (detail endpoint only)
    pub polyline: Option<String>,
    pub summary_polyline: Option<String>,
}

impl ActivityMap {
    fn best_polyline(&self) -> Option<&str> {
        self.polyline
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.summary_polyline.as_deref())
    }
}

/// Detailed activity from `GET /activities/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDetail {
    #[serde(flatten)]
    pub summary: ActivitySummary,
    pub description: Option<String>,
    pub calories: Option<f64>,
    pub device_name: Option<String>,
    pub gear_id: Option<String>,
    pub elev_high: Option<f64>,
    pub elev_low: Option<f64>,
    pub segment_efforts: Option<Vec<SegmentEffort>>,
    pub laps: Option<Vec<Lap>>,
    pub splits_metric: Option<Vec<Split>>,
    pub splits_standard: Option<Vec<Split>>,
    pub photos: Option<PhotoSummary>,
}

impl ActivityDetail {
    pub fn polyline(&self) -> Option<&str> {
        self.summary.polyline()
    }

    pub fn coordinates(&self) -> Result<Vec<Coordinate>, PolylineError> {
        self.summary.coordinates()
    }
}

/// One effort on a segment within a detailed activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEffort {
    pub id: u64,
    pub name: Option<String>,
    pub elapsed_time: Option<u64>,
    pub moving_time: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub distance: Option<f64>,
    pub average_watts: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub max_heartrate: Option<f64>,
    pub pr_rank: Option<u32>,
    pub kom_rank: Option<u32>,
    pub segment: Option<SegmentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub id: u64,
    pub name: Option<String>,
    pub distance: Option<f64>,
    pub average_grade: Option<f64>,
    pub climb_category: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lap {
    pub id: u64,
    pub name: Option<String>,
    pub lap_index: Option<u32>,
    pub elapsed_time: Option<u64>,
    pub moving_time: Option<u64>,
    pub start_date: Option<DateTime<Utc>>,
    pub distance: Option<f64>,
    pub total_elevation_gain: Option<f64>,
    pub average_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub average_cadence: Option<f64>,
    pub average_watts: Option<f64>,
    pub average_heartrate: Option<f64>,
}

/// Per-kilometer or per-mile split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Split {
    pub split: u32,
    pub distance: Option<f64>,
    pub elapsed_time: Option<u64>,
    pub moving_time: Option<u64>,
    pub elevation_difference: Option<f64>,
    pub average_speed: Option<f64>,
    pub average_heartrate: Option<f64>,
    pub pace_zone: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSummary {
    pub count: u32,
    pub primary: Option<PrimaryPhoto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryPhoto {
    pub unique_id: Option<String>,
    /// Image URLs keyed by size ("100", "600")
    pub urls: Option<HashMap<String, String>>,
    pub source: Option<u32>,
}

/// Decode `[lat, lng]`; anything else (including `[]` and null) is `None`.
fn deserialize_latlng<'de, D>(deserializer: D) -> Result<Option<Coordinate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<f64>> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some(&[latitude, longitude]) => Some(Coordinate {
            latitude,
            longitude,
        }),
        _ => None,
    })
}

fn serialize_latlng<S>(value: &Option<Coordinate>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    value
        .map(|c| [c.latitude, c.longitude])
        .serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_optional_fields_absent() {
        let activity: ActivitySummary = serde_json::from_value(json!({
            "id": 42,
            "start_date": "2024-01-15T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(activity.id, 42);
        assert!(activity.name.is_none());
        assert!(activity.distance.is_none());
        assert!(activity.average_watts.is_none());
        assert!(activity.start_latlng.is_none());
        assert!(activity.polyline().is_none());
        assert!(activity.coordinates().unwrap().is_empty());
    }

    #[test]
    fn test_summary_requires_start_date() {
        let result = serde_json::from_value::<ActivitySummary>(json!({
            "id": 42,
            "name": "Morning Ride"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_latlng_is_none() {
        let activity: ActivitySummary = serde_json::from_value(json!({
            "id": 1,
            "start_date": "2024-01-15T10:00:00Z",
            "start_latlng": [],
            "end_latlng": [37.8049, -122.4294]
        }))
        .unwrap();

        assert!(activity.start_latlng.is_none());
        let end = activity.end_latlng.unwrap();
        assert_eq!(end.latitude, 37.8049);
        assert_eq!(end.longitude, -122.4294);
    }

    #[test]
    fn test_polyline_prefers_detailed() {
        let map = ActivityMap {
            id: Some("a1".to_string()),
            polyline: Some("_p~iF~ps|U".to_string()),
            summary_polyline: Some("summary".to_string()),
        };
        assert_eq!(map.best_polyline(), Some("_p~iF~ps|U"));

        let map = ActivityMap {
            polyline: Some(String::new()),
            ..map
        };
        assert_eq!(map.best_polyline(), Some("summary"));
    }

    #[test]
    fn test_detail_flattens_summary() {
        let detail: ActivityDetail = serde_json::from_value(json!({
            "id": 7,
            "name": "Twin Peaks",
            "type": "Ride",
            "sport_type": "Ride",
            "start_date": "2024-01-15T10:00:00Z",
            "description": "Up and over",
            "calories": 680.0,
            "map": { "id": "a7", "polyline": "_p~iF~ps|U_ulLnnqC", "summary_polyline": null },
            "laps": [{ "id": 1, "lap_index": 1, "distance": 1000.0 }],
            "photos": { "count": 0, "primary": null }
        }))
        .unwrap();

        assert_eq!(detail.summary.id, 7);
        assert_eq!(detail.summary.activity_type.as_deref(), Some("Ride"));
        assert_eq!(detail.description.as_deref(), Some("Up and over"));
        assert_eq!(detail.laps.as_ref().map(Vec::len), Some(1));
        assert!(detail.segment_efforts.is_none());
        assert_eq!(detail.photos.as_ref().map(|p| p.count), Some(0));
        assert_eq!(detail.coordinates().unwrap().len(), 2);
    }
}
