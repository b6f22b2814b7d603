//! Route catalog and first-match route identification.
//!
//! The catalog is scanned in its given order and the first route whose
//! geometry matches the activity wins, even if a later route would be a
//! closer fit. Catalog order therefore decides between overlapping routes.

use std::path::Path;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::line_match::lines_match;
use crate::{polyline, Activity, Coordinate, MatchConfig, Result, RouteEffortsError};

/// A known course in the catalog.
///
/// The prior effort count may be stored directly in `previous_efforts` or
/// embedded in `description` as "Previous Efforts: N".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub name: String,
    /// Canonical geometry (precision-5 encoded polyline)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoded_polyline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_efforts: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Route {
    pub fn new(name: impl Into<String>, encoded_polyline: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            encoded_polyline: Some(encoded_polyline.into()),
            ..Default::default()
        }
    }

    /// Create a route whose geometry is the given track.
    pub fn from_track(name: impl Into<String>, track: &[Coordinate]) -> Result<Self> {
        Ok(Self::new(name, polyline::encode(track)?))
    }

    pub fn with_previous_efforts(mut self, previous_efforts: u64) -> Self {
        self.previous_efforts = Some(previous_efforts);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Encoded geometry, treating an empty string as absent.
    pub fn geometry(&self) -> Option<&str> {
        self.encoded_polyline.as_deref().filter(|p| !p.is_empty())
    }
}

/// An ordered list of routes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteCatalog {
    routes: Vec<Route>,
}

impl RouteCatalog {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Parse a JSON array of routes (`name`, `encodedPolyline`, `previousEfforts`, `description`).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let routes: Vec<Route> =
            serde_json::from_str(json).map_err(|e| RouteEffortsError::Catalog {
                message: format!("invalid catalog JSON: {}", e),
            })?;
        Ok(Self::new(routes))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| RouteEffortsError::Catalog {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        let catalog = Self::from_json_str(&json)?;
        info!(
            "[CatalogMatcher] Loaded {} routes from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl From<Vec<Route>> for RouteCatalog {
    fn from(routes: Vec<Route>) -> Self {
        Self::new(routes)
    }
}

/// Identify the route an activity follows.
///
/// Returns `Ok(None)` without scanning when the activity has no usable
/// polyline. A malformed activity polyline is an error; malformed route
/// geometry only skips that route.
pub fn identify_route<'a>(
    activity: &Activity,
    routes: &'a [Route],
    config: &MatchConfig,
) -> Result<Option<&'a Route>> {
    let Some(encoded) = activity.track_polyline() else {
        debug!("[CatalogMatcher] Activity {} has no polyline", activity.id);
        return Ok(None);
    };

    let track = polyline::decode(encoded)?;
    if track.is_empty() {
        debug!("[CatalogMatcher] Activity {} has an empty track", activity.id);
        return Ok(None);
    }

    Ok(identify_track(&track, routes, config))
}

/// Return the first route in `routes` whose geometry matches `track`.
pub fn identify_track<'a>(
    track: &[Coordinate],
    routes: &'a [Route],
    config: &MatchConfig,
) -> Option<&'a Route> {
    if track.len() < 2 {
        return None;
    }

    for route in routes {
        let Some(encoded) = route.geometry() else {
            warn!("[CatalogMatcher] Skipping '{}': no geometry", route.name);
            continue;
        };

        let route_track = match polyline::decode(encoded) {
            Ok(route_track) => route_track,
            Err(e) => {
                warn!("[CatalogMatcher] Skipping '{}': {}", route.name, e);
                continue;
            }
        };
        if route_track.len() < 2 {
            warn!(
                "[CatalogMatcher] Skipping '{}': {} point geometry",
                route.name,
                route_track.len()
            );
            continue;
        }

        if lines_match(&route_track, track, config.tolerance) {
            debug!("[CatalogMatcher] Matched '{}'", route.name);
            return Some(route);
        }
    }

    None
}

/// Identify routes for many activities in parallel.
///
/// Results are returned in the same order as `activities`.
#[cfg(feature = "parallel")]
pub fn identify_routes_parallel<'a>(
    activities: &[Activity],
    routes: &'a [Route],
    config: &MatchConfig,
) -> Vec<Result<Option<&'a Route>>> {
    use rayon::prelude::*;

    activities
        .par_iter()
        .map(|activity| identify_route(activity, routes, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecodeError;

    fn straight_route(points: usize) -> Vec<Coordinate> {
        (0..points)
            .map(|i| Coordinate::new(51.5, -0.2 + i as f64 * 0.001))
            .collect()
    }

    fn shifted(route: &[Coordinate], dlat: f64) -> Vec<Coordinate> {
        route
            .iter()
            .map(|p| Coordinate::new(p.latitude + dlat, p.longitude))
            .collect()
    }

    fn activity_on(track: &[Coordinate]) -> Activity {
        Activity::new(1).with_polyline(polyline::encode(track).unwrap())
    }

    #[test]
    fn test_identify_matching_route() {
        let track = straight_route(20);
        let routes = vec![
            Route::from_track("Elsewhere", &shifted(&track, 0.05)).unwrap(),
            Route::from_track("Loop A", &track).unwrap(),
        ];

        let route = identify_route(&activity_on(&track), &routes, &MatchConfig::default()).unwrap();
        assert_eq!(route.map(|r| r.name.as_str()), Some("Loop A"));
    }

    #[test]
    fn test_first_match_wins_over_closer_match() {
        let track = straight_route(20);
        let routes = vec![
            Route::from_track("Nearby", &shifted(&track, 0.003)).unwrap(),
            Route::from_track("Exact", &track).unwrap(),
        ];

        let route = identify_track(&track, &routes, &MatchConfig::default());
        assert_eq!(route.map(|r| r.name.as_str()), Some("Nearby"));
    }

    #[test]
    fn test_empty_catalog() {
        let track = straight_route(20);
        let result = identify_route(&activity_on(&track), &[], &MatchConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_activity_without_polyline() {
        let routes = vec![Route::from_track("Loop A", &straight_route(20)).unwrap()];
        let result = identify_route(&Activity::new(1), &routes, &MatchConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_activity_with_empty_track() {
        let routes = vec![Route::from_track("Loop A", &straight_route(20)).unwrap()];
        assert!(identify_track(&[], &routes, &MatchConfig::default()).is_none());
    }

    #[test]
    fn test_summary_polyline_used_when_full_missing() {
        let track = straight_route(20);
        let routes = vec![Route::from_track("Loop A", &track).unwrap()];
        let activity = Activity::new(1).with_summary_polyline(polyline::encode(&track).unwrap());

        let route = identify_route(&activity, &routes, &MatchConfig::default()).unwrap();
        assert!(route.is_some());
    }

    #[test]
    fn test_malformed_activity_polyline_is_error() {
        let routes = vec![Route::from_track("Loop A", &straight_route(20)).unwrap()];
        let activity = Activity::new(1).with_polyline("_p~iF~ps|");

        let result = identify_route(&activity, &routes, &MatchConfig::default());
        assert!(matches!(
            result,
            Err(RouteEffortsError::Decode(DecodeError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_bad_route_geometry_is_skipped() {
        let track = straight_route(20);
        let routes = vec![
            Route {
                name: "No geometry".to_string(),
                ..Default::default()
            },
            Route::new("Empty geometry", ""),
            Route::new("Corrupt", "not a polyline ###"),
            Route::new("Single point", "??"),
            Route::from_track("Loop A", &track).unwrap(),
        ];

        let route = identify_track(&track, &routes, &MatchConfig::default());
        assert_eq!(route.map(|r| r.name.as_str()), Some("Loop A"));
    }

    /// Collects `[CatalogMatcher]` records so skip levels can be asserted.
    struct CapturedLogs(std::sync::Mutex<Vec<(log::Level, String)>>);

    impl log::Log for CapturedLogs {
        fn enabled(&self, _: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            let message = record.args().to_string();
            if message.starts_with("[CatalogMatcher]") {
                if let Ok(mut records) = self.0.lock() {
                    records.push((record.level(), message));
                }
            }
        }

        fn flush(&self) {}
    }

    static CAPTURED: CapturedLogs = CapturedLogs(std::sync::Mutex::new(Vec::new()));

    #[test]
    fn test_skipped_routes_warn() {
        let _ = log::set_logger(&CAPTURED);
        log::set_max_level(log::LevelFilter::Debug);

        let track = straight_route(20);
        let routes = vec![
            Route {
                name: "Warn: no geometry".to_string(),
                ..Default::default()
            },
            Route::new("Warn: empty geometry", ""),
            Route::new("Warn: corrupt", "not a polyline ###"),
            Route::new("Warn: single point", "??"),
        ];

        assert!(identify_track(&track, &routes, &MatchConfig::default()).is_none());

        let records = CAPTURED.0.lock().unwrap().clone();
        for route in &routes {
            let skip = records
                .iter()
                .find(|(_, message)| message.contains(&format!("'{}'", route.name)))
                .unwrap_or_else(|| panic!("no log for {}", route.name));
            assert_eq!(skip.0, log::Level::Warn, "{}", skip.1);
        }
    }

    #[test]
    fn test_no_match() {
        let track = straight_route(20);
        let routes = vec![Route::from_track("Elsewhere", &shifted(&track, 0.02)).unwrap()];
        assert!(identify_track(&track, &routes, &MatchConfig::default()).is_none());
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"[
            { "name": "Loop A", "encodedPolyline": "_p~iF~ps|U_ulLnnqC", "previousEfforts": 10 },
            { "name": "Hill Repeats", "description": "Previous Efforts: 4", "surface": "gravel" }
        ]"#;

        let catalog = RouteCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.routes()[0].previous_efforts, Some(10));
        assert_eq!(catalog.routes()[0].geometry(), Some("_p~iF~ps|U_ulLnnqC"));
        assert_eq!(catalog.routes()[1].geometry(), None);
        assert_eq!(
            catalog.routes()[1].description.as_deref(),
            Some("Previous Efforts: 4")
        );
    }

    #[test]
    fn test_catalog_requires_names() {
        let result = RouteCatalog::from_json_str(r#"[{ "encodedPolyline": "??" }]"#);
        assert!(matches!(result, Err(RouteEffortsError::Catalog { .. })));
    }

    #[test]
    fn test_catalog_missing_file() {
        let result = RouteCatalog::from_json_file("/nonexistent/routes.json");
        assert!(matches!(result, Err(RouteEffortsError::Catalog { .. })));
    }

    #[test]
    fn test_route_serializes_camel_case() {
        let route = Route::new("Loop A", "??").with_previous_efforts(3);
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "Loop A", "encodedPolyline": "??", "previousEfforts": 3 })
        );
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_identify_routes_parallel_preserves_order() {
        let track = straight_route(20);
        let other = shifted(&track, 0.05);
        let routes = vec![
            Route::from_track("Loop A", &track).unwrap(),
            Route::from_track("Loop B", &other).unwrap(),
        ];
        let activities = vec![
            activity_on(&other),
            Activity::new(2),
            activity_on(&track),
            Activity::new(4).with_polyline("###"),
        ];

        let results = identify_routes_parallel(&activities, &routes, &MatchConfig::default());
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().map(|r| r.name.as_str()), Some("Loop B"));
        assert!(results[1].as_ref().unwrap().is_none());
        assert_eq!(results[2].as_ref().unwrap().map(|r| r.name.as_str()), Some("Loop A"));
        assert!(results[3].is_err());
    }
}
