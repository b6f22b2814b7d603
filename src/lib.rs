//! # Route Efforts
//!
//! Recognise repeated traversals of known routes and title activities with
//! their running effort count.
//!
//! This library provides:
//! - Encoded polyline decoding (precision 5)
//! - Geometric line matching within a fixed tolerance
//! - First-match route identification against an ordered catalog
//! - Effort counting, titles and heart-rate annotations
//! - Webhook payload validation and collaborator-driven orchestration
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch identification with rayon
//! - **`http`** - Enable the Strava API client and the reprocessing binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_efforts::{identify_track, title, Activity, MatchConfig, Route};
//! use route_efforts::{polyline, Coordinate};
//!
//! let loop_a = vec![
//!     Coordinate::new(51.5074, -0.1278),
//!     Coordinate::new(51.5080, -0.1290),
//!     Coordinate::new(51.5090, -0.1300),
//! ];
//!
//! let catalog = vec![Route::from_track("Loop A", &loop_a).unwrap().with_previous_efforts(10)];
//!
//! let route = identify_track(&loop_a, &catalog, &MatchConfig::default()).unwrap();
//! assert_eq!(title(route, &Activity::new(1)), "Loop A #10");
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{DecodeError, Result, RouteEffortsError};

// Encoded polyline codec
pub mod polyline;

// Line matching within a tolerance (symmetric, direction-agnostic)
pub mod line_match;
pub use line_match::{lines_match, unmatched_segments, Segment};

// Activity payload schema
pub mod activity;
pub use activity::{Activity, ActivityMap, SimilarActivities};

// Route catalog and first-match identification
pub mod catalog;
#[cfg(feature = "parallel")]
pub use catalog::identify_routes_parallel;
pub use catalog::{identify_route, identify_track, Route, RouteCatalog};

// Effort counting, titles and heart-rate annotations
pub mod efforts;
pub use efforts::{
    annotate, effort_count, heart_rate_annotation, prior_efforts, title, ActivityAnnotation,
    EffortTally,
};

// Webhook event schema and subscription verification
pub mod webhook;
pub use webhook::{
    verify_subscription, AspectType, ObjectType, SubscriptionChallenge, SubscriptionRequest,
    WebhookEvent,
};

// Environment configuration
pub mod config;
pub use config::StravaConfig;

// Orchestration over the activity/route/update collaborators
pub mod annotate;
pub use annotate::{
    handle_event, reprocess_activities, ActivitySource, ActivityUpdater, EventOutcome,
    ReprocessSummary, RouteSource, StaticRoutes,
};

// HTTP client for the Strava API
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::StravaClient;

// ============================================================================
// Core Types
// ============================================================================

/// A geographic coordinate in degrees.
///
/// # Example
/// ```
/// use route_efforts::Coordinate;
/// let point = Coordinate::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// An ordered path of coordinates. Order is significant.
pub type Track = Vec<Coordinate>;

/// Bounding box of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from coordinates.
    pub fn from_points(points: &[Coordinate]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Grow the bounds by `margin` degrees on every side.
    pub fn expand(&self, margin: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin,
            max_lat: self.max_lat + margin,
            min_lng: self.min_lng - margin,
            max_lng: self.max_lng + margin,
        }
    }

    /// Check whether `other` lies entirely inside these bounds.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lng >= self.min_lng
            && other.max_lng <= self.max_lng
    }
}

/// Configuration for route matching and annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Maximum deviation between two tracks, in degrees.
    /// Default: 0.005 (~500 m at mid-latitudes)
    pub tolerance: f64,

    /// Average heart rate at or below which an activity is tagged "MAF".
    /// Default: 145.0 bpm
    pub maf_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.005,
            maf_threshold: 145.0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
