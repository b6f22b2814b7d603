//! End-to-end tests through the public API.
//!
//! Covers the full path from an encoded activity polyline to its new title:
//! decode -> identify against the catalog -> count efforts -> annotate.

use route_efforts::{
    annotate, effort_count, identify_route, identify_track, lines_match, polyline, title,
    Activity, Coordinate, MatchConfig, Route, RouteCatalog,
};

/// A gently curving course of ~2km.
fn loop_a() -> Vec<Coordinate> {
    (0..40)
        .map(|i| {
            let t = i as f64 * 0.0005;
            Coordinate::new(51.5 + (t * 40.0).sin() * 0.002, -0.2 + t)
        })
        .collect()
}

/// Same course with every point nudged by ~100m of GPS noise.
fn noisy(track: &[Coordinate]) -> Vec<Coordinate> {
    track
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let jitter = if i % 2 == 0 { 0.0008 } else { -0.0008 };
            Coordinate::new(c.latitude + jitter, c.longitude)
        })
        .collect()
}

fn shifted(track: &[Coordinate], dlat: f64) -> Vec<Coordinate> {
    track
        .iter()
        .map(|c| Coordinate::new(c.latitude + dlat, c.longitude))
        .collect()
}

// ============================================================================
// Scenario: Loop A with 10 prior efforts
// ============================================================================

#[test]
fn test_loop_a_scenario() {
    let catalog = vec![Route::from_track("Loop A", &loop_a())
        .unwrap()
        .with_previous_efforts(10)];

    let activity = Activity::new(1)
        .with_polyline(polyline::encode(&noisy(&loop_a())).unwrap())
        .with_effort_count(2);

    let config = MatchConfig::default();
    let route = identify_route(&activity, &catalog, &config)
        .unwrap()
        .expect("activity should follow Loop A");

    assert_eq!(route.name, "Loop A");
    assert_eq!(effort_count(route, Some(&activity)), 12);
    assert_eq!(title(route, &activity), "Loop A #12");
}

#[test]
fn test_loop_a_from_catalog_json() {
    let encoded = polyline::encode(&loop_a()).unwrap();
    let json = serde_json::json!([
        { "name": "Elsewhere", "encodedPolyline": polyline::encode(&shifted(&loop_a(), 1.0)).unwrap() },
        { "name": "Loop A", "encodedPolyline": encoded, "previousEfforts": 10 }
    ])
    .to_string();
    let catalog = RouteCatalog::from_json_str(&json).unwrap();

    let activity = Activity::from_json(&format!(
        r#"{{"id": 7, "name": "Morning Run", "average_heartrate": 139.4,
            "map": {{"polyline": null, "summary_polyline": "{}"}},
            "similar_activities": {{"effort_count": 2}}}}"#,
        polyline::encode(&noisy(&loop_a())).unwrap()
    ))
    .unwrap();

    let config = MatchConfig::default();
    let route = identify_route(&activity, catalog.routes(), &config)
        .unwrap()
        .unwrap();
    let annotation = annotate(route, &activity, &config);

    assert_eq!(annotation.name, "Loop A #12");
    assert_eq!(annotation.description.as_deref(), Some("MAF ❤️ 139 bpm"));
}

// ============================================================================
// Matching properties
// ============================================================================

#[test]
fn test_decoding_is_deterministic() {
    let encoded = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";
    assert_eq!(polyline::decode(encoded).unwrap(), polyline::decode(encoded).unwrap());
}

#[test]
fn test_matching_is_reflexive() {
    let track = loop_a();
    for tolerance in [0.0, 0.0001, 0.005, 1.0] {
        assert!(lines_match(&track, &track, tolerance), "tolerance {}", tolerance);
    }
}

#[test]
fn test_matching_is_symmetric() {
    let a = loop_a();
    let candidates = [
        noisy(&a),
        shifted(&a, 0.003),
        shifted(&a, 0.01),
        a[..20].to_vec(),
        a.iter().rev().copied().collect(),
    ];

    for b in &candidates {
        for tolerance in [0.001, 0.005, 0.02] {
            assert_eq!(lines_match(&a, b, tolerance), lines_match(b, &a, tolerance));
        }
    }
}

#[test]
fn test_matching_is_monotonic_in_tolerance() {
    let a = loop_a();
    let b = shifted(&a, 0.003);

    assert!(!lines_match(&a, &b, 0.002));
    for tolerance in [0.004, 0.005, 0.01, 0.1] {
        assert!(lines_match(&a, &b, tolerance), "tolerance {}", tolerance);
    }
}

// ============================================================================
// Identification edge cases
// ============================================================================

#[test]
fn test_empty_track_or_catalog_never_matches() {
    let config = MatchConfig::default();
    let catalog = vec![Route::from_track("Loop A", &loop_a()).unwrap()];

    assert!(identify_track(&[], &catalog, &config).is_none());
    assert!(identify_track(&loop_a(), &[], &config).is_none());
    assert_eq!(
        identify_route(&Activity::new(1), &catalog, &config).unwrap(),
        None
    );
}

#[test]
fn test_first_match_wins_over_closer_match() {
    let config = MatchConfig::default();
    let catalog = vec![
        Route::from_track("Nearby", &shifted(&loop_a(), 0.003)).unwrap(),
        Route::from_track("Exact", &loop_a()).unwrap(),
    ];

    let route = identify_track(&loop_a(), &catalog, &config).unwrap();
    assert_eq!(route.name, "Nearby");

    let reversed: Vec<Route> = catalog.into_iter().rev().collect();
    let route = identify_track(&loop_a(), &reversed, &config).unwrap();
    assert_eq!(route.name, "Exact");
}

#[test]
fn test_description_marker_and_activity_count() {
    let route = Route::from_track("Another Route", &loop_a())
        .unwrap()
        .with_description("Previous Efforts: 31");

    assert_eq!(effort_count(&route, None), 31);
    assert_eq!(
        effort_count(&route, Some(&Activity::new(1).with_effort_count(23))),
        54
    );
}
