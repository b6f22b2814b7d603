//! Encoded polyline codec (precision 5, as used by Strava and Google Maps).
//!
//! Decoding is strict: a truncated value or a byte outside the polyline
//! alphabet is a [`DecodeError`], never a silently shortened track.
//! An empty string decodes to an empty track.

use geo::Coord;

use crate::error::{DecodeError, RouteEffortsError};
use crate::{Coordinate, Result, Track};

/// Number of decimal digits carried by each coordinate.
pub const PRECISION: u32 = 5;

const FACTOR: f64 = 100_000.0;

/// Lowest and highest bytes of the polyline alphabet (`?` and `~`).
const MIN_BYTE: u8 = 63;
const MAX_BYTE: u8 = 126;

const CONTINUATION_BIT: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;

/// Decode an encoded polyline into a track.
///
/// Latitude and longitude deltas are accumulated independently as integers
/// and only divided by the precision factor when a coordinate is emitted, so
/// the result is identical to other precision-5 decoders.
///
/// # Example
/// ```
/// use route_efforts::polyline::decode;
///
/// let track = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(track.len(), 3);
/// assert_eq!(track[0].latitude, 38.5);
/// assert_eq!(track[0].longitude, -120.2);
/// ```
pub fn decode(encoded: &str) -> std::result::Result<Track, DecodeError> {
    let bytes = encoded.as_bytes();
    let mut track = Vec::new();
    let mut index = 0;
    let mut scaled_lat: i64 = 0;
    let mut scaled_lng: i64 = 0;

    while index < bytes.len() {
        let value_start = index;
        let (lat_change, next) = decode_value(bytes, index)?;
        if next >= bytes.len() {
            return Err(DecodeError::Truncated { index: next });
        }
        let (lng_change, next) = decode_value(bytes, next)?;
        index = next;

        scaled_lat = scaled_lat
            .checked_add(lat_change)
            .ok_or(DecodeError::Overflow { index: value_start })?;
        scaled_lng = scaled_lng
            .checked_add(lng_change)
            .ok_or(DecodeError::Overflow { index: value_start })?;

        track.push(Coordinate::new(
            scaled_lat as f64 / FACTOR,
            scaled_lng as f64 / FACTOR,
        ));
    }

    Ok(track)
}

/// Read one zig-zag encoded value starting at `start`.
///
/// Returns the signed value and the index of the first byte after it.
fn decode_value(bytes: &[u8], start: usize) -> std::result::Result<(i64, usize), DecodeError> {
    let mut result: u64 = 0;
    let mut shift: u32 = 0;
    let mut index = start;

    loop {
        let byte = *bytes.get(index).ok_or(DecodeError::Truncated { index })?;
        if !(MIN_BYTE..=MAX_BYTE).contains(&byte) {
            return Err(DecodeError::InvalidCharacter { index, byte });
        }

        let chunk = u64::from(byte - MIN_BYTE);
        let bits = chunk & CHUNK_MASK;
        // The 13th chunk only has room for 4 bits.
        if shift > 60 || (shift == 60 && bits > 0xf) {
            return Err(DecodeError::Overflow { index: start });
        }

        result |= bits << shift;
        shift += 5;
        index += 1;

        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };

    Ok((value, index))
}

/// Encode a track as a precision-5 polyline.
///
/// Fails for coordinates outside the valid latitude/longitude range.
pub fn encode(track: &[Coordinate]) -> Result<String> {
    let coords = track.iter().map(|p| Coord {
        x: p.longitude,
        y: p.latitude,
    });

    polyline::encode_coordinates(coords, PRECISION).map_err(|e| RouteEffortsError::Encode {
        message: e.to_string(),
    })
}
