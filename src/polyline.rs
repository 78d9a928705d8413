// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encoded polyline decoding (Strava format, precision 5).
//!
//! Each value is a zig-zag encoded delta split into 5-bit chunks, least
//! significant chunk first. Every chunk is stored as `chunk + 63`, with bit
//! 0x20 set on all but the last chunk of a value. Values alternate latitude,
//! longitude and accumulate from zero.

use geo::LineString;
use serde::{Deserialize, Serialize};

/// Scale factor for precision-5 polylines.
const PRECISION: f64 = 1e-5;

/// Offset added to every chunk to land in printable ASCII.
const CHUNK_OFFSET: u8 = 63;

/// Continuation flag within a chunk.
const CONTINUATION: u8 = 0x20;

/// A zig-zag encoded 32-bit delta needs at most seven 5-bit chunks.
const MAX_SHIFT: u32 = 35;

/// A single decoded point, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Errors from polyline decoding. Offsets are byte positions in the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("input ended mid-value at byte {offset}")]
    Truncated { offset: usize },

    #[error("byte 0x{byte:02x} at offset {offset} is outside the polyline alphabet")]
    InvalidByte { offset: usize, byte: u8 },

    /// The delta ending at `offset` does not fit a signed 32-bit integer.
    #[error("value at byte {offset} does not fit in 32 bits")]
    Overflow { offset: usize },
}

/// Decode an encoded polyline into coordinates.
///
/// Empty input yields an empty sequence.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut coordinates = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;

        coordinates.push(Coordinate {
            latitude: lat as f64 * PRECISION,
            longitude: lng as f64 * PRECISION,
        });
    }

    Ok(coordinates)
}

/// Decode an optional polyline; `None` yields an empty sequence.
pub fn decode_optional(encoded: Option<&str>) -> Result<Vec<Coordinate>, PolylineError> {
    encoded.map_or_else(|| Ok(Vec::new()), decode)
}

/// Convert decoded coordinates into a `geo` line string (x = longitude, y = latitude).
pub fn to_line_string(coordinates: &[Coordinate]) -> LineString<f64> {
    coordinates
        .iter()
        .map(|c| (c.longitude, c.latitude))
        .collect::<Vec<_>>()
        .into()
}

/// Read one zig-zag encoded value starting at `index`, advancing past it.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let offset = *index;
        let byte = *bytes
            .get(offset)
            .ok_or(PolylineError::Truncated { offset })?;

        let chunk = byte
            .checked_sub(CHUNK_OFFSET)
            .filter(|c| *c < 2 * CONTINUATION)
            .ok_or(PolylineError::InvalidByte { offset, byte })?;

        if shift >= MAX_SHIFT {
            return Err(PolylineError::Overflow { offset });
        }

        result |= u64::from(chunk & 0x1F) << shift;
        shift += 5;
        *index += 1;

        if chunk & CONTINUATION == 0 {
            // Seven chunks carry 35 bits; only the low 32 are valid.
            let result =
                u32::try_from(result).map_err(|_| PolylineError::Overflow { offset })?;
            let value = i64::from(result >> 1);
            return Ok(if result & 1 != 0 { !value } else { value });
        }
    }
}
