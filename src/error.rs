//! Unified error handling for the route-efforts library.
//!
//! Only malformed input is an error. A missing polyline, a catalog entry
//! without geometry and an unmatched track are ordinary outcomes and are
//! modelled as `None`/skips by the callers, never as errors.

use thiserror::Error;

/// Failure to decode an encoded polyline string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A byte outside the polyline alphabet (`?` to `~`)
    #[error("invalid polyline character 0x{byte:02x} at index {index}")]
    InvalidCharacter { index: usize, byte: u8 },
    /// Input ended in the middle of a value, or after a latitude with no longitude
    #[error("polyline truncated at index {index}")]
    Truncated { index: usize },
    /// A single value used more chunks than fit in 64 bits
    #[error("polyline value starting at index {index} overflows")]
    Overflow { index: usize },
}

/// Error type for route-efforts operations.
#[derive(Debug, Clone, Error)]
pub enum RouteEffortsError {
    /// Malformed encoded polyline
    #[error("failed to decode polyline: {0}")]
    Decode(#[from] DecodeError),
    /// Track could not be encoded
    #[error("failed to encode polyline: {message}")]
    Encode { message: String },
    /// Inbound payload did not satisfy its schema
    #[error("invalid payload: {message}")]
    InvalidPayload { message: String },
    /// Route catalog could not be read or parsed
    #[error("route catalog error: {message}")]
    Catalog { message: String },
    /// Missing or invalid configuration
    #[error("configuration error: {message}")]
    Config { message: String },
    /// HTTP/API error
    #[error("{}", http_message(.message, .status_code))]
    Http {
        message: String,
        status_code: Option<u16>,
    },
}

fn http_message(message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!("HTTP error ({}): {}", code, message),
        None => format!("HTTP error: {}", message),
    }
}

/// Result type alias for route-efforts operations.
pub type Result<T> = std::result::Result<T, RouteEffortsError>;
