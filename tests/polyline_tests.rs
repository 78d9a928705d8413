// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Polyline decoder tests, cross-checked against the `polyline` crate.

use serde_json::Value;
use std::fs;
use strive_sync::error::Error;
use strive_sync::models::ActivitySummary;
use strive_sync::polyline::{decode, to_line_string, PolylineError};

const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

fn fixture_polylines() -> (String, String) {
    let fixture = fs::read_to_string("tests/fixtures/activity_16804567307.json")
        .expect("Failed to read fixture");
    let json: Value = serde_json::from_str(&fixture).expect("Failed to parse fixture");
    let map = &json["map"];
    (
        map["polyline"].as_str().unwrap().to_string(),
        map["summary_polyline"].as_str().unwrap().to_string(),
    )
}

fn assert_matches_reference_decoder(encoded: &str) {
    let ours = decode(encoded).unwrap();
    let theirs = polyline::decode_polyline(encoded, 5).unwrap();

    assert_eq!(ours.len(), theirs.0.len());
    for (a, b) in ours.iter().zip(theirs.0.iter()) {
        assert!((a.latitude - b.y).abs() < 1e-9, "lat {} vs {}", a.latitude, b.y);
        assert!((a.longitude - b.x).abs() < 1e-9, "lng {} vs {}", a.longitude, b.x);
    }
}

#[test]
fn test_reference_polyline_matches_polyline_crate() {
    assert_matches_reference_decoder(REFERENCE);
}

#[test]
fn test_activity_polylines_match_polyline_crate() {
    let (detailed, summary) = fixture_polylines();
    assert_matches_reference_decoder(&detailed);
    assert_matches_reference_decoder(&summary);

    assert_eq!(decode(&detailed).unwrap().len(), 400);
    assert_eq!(decode(&summary).unwrap().len(), 40);
}

#[test]
fn test_every_prefix_decodes_or_errors() {
    let (detailed, _) = fixture_polylines();
    let mut complete = 0;

    for end in 0..=200 {
        match decode(&detailed[..end]) {
            Ok(coords) => {
                complete += 1;
                let full = decode(&detailed).unwrap();
                assert_eq!(coords[..], full[..coords.len()]);
            }
            Err(PolylineError::Truncated { offset }) => assert_eq!(offset, end),
            Err(other) => panic!("unexpected error for prefix {}: {}", end, other),
        }
    }
    assert!(complete > 1);
}

#[test]
fn test_arbitrary_bytes_never_panic() {
    for a in 0u8..128 {
        for b in 0u8..128 {
            let input = String::from_utf8(vec![a, b, b'?', b'?']).unwrap();
            let _ = decode(&input);
        }
    }
}

#[test]
fn test_line_string_for_geometry() {
    let line = to_line_string(&decode(REFERENCE).unwrap());

    assert_eq!(line.0.len(), 3);
    assert!((line.0[2].x - -126.453).abs() < 1e-9);
    assert!((line.0[2].y - 43.252).abs() < 1e-9);
}

#[test]
fn test_malformed_activity_polyline_surfaces_as_error() {
    let activity: ActivitySummary = serde_json::from_value(serde_json::json!({
        "id": 3,
        "start_date": "2024-03-01T12:00:00Z",
        "map": { "id": "a3", "summary_polyline": "_p~iF~ps|U_" }
    }))
    .unwrap();

    let err: Error = activity.coordinates().unwrap_err().into();
    assert!(matches!(err, Error::MalformedPolyline(PolylineError::Truncated { .. })));
}
