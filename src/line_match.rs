//! Line matching within a distance tolerance.
//!
//! Two tracks match when every point of each lies within `tolerance` of the
//! other (planar distance in degree units). Matching is computed per segment:
//! - The part of a segment inside the tolerance capsule of another segment is
//!   a single parameter interval (the capsule is convex)
//! - Covered intervals from nearby segments are merged
//! - Whatever remains uncovered is reported as a mismatched [`Segment`]
//!
//! The comparison is position-based, so sampling rate, point count and
//! direction of travel do not matter.

use geo::Coord;
use rstar::{RTree, RTreeObject, AABB};

use crate::{Bounds, Coordinate};

/// Uncovered pieces shorter than this (in degrees) are rounding noise.
const MIN_GAP: f64 = 1e-12;

/// A piece of a track lying beyond the tolerance of the other track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Coordinate,
    pub end: Coordinate,
}

/// Reference segment indexed by its envelope for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedSegment {
    start: Coord,
    end: Coord,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.start.x, self.start.y], [self.end.x, self.end.y])
    }
}

/// Check whether two tracks describe the same path within `tolerance` degrees.
///
/// Symmetric by construction: both directed comparisons must come back clean.
/// Tracks with fewer than 2 coordinates, non-finite coordinates and a negative
/// or NaN tolerance never match.
///
/// # Example
/// ```
/// use route_efforts::{lines_match, Coordinate};
///
/// let track = vec![
///     Coordinate::new(51.5000, -0.2000),
///     Coordinate::new(51.5000, -0.1900),
/// ];
/// let drifted: Vec<Coordinate> = track
///     .iter()
///     .map(|p| Coordinate::new(p.latitude + 0.001, p.longitude))
///     .collect();
///
/// assert!(lines_match(&track, &drifted, 0.005));
/// assert!(!lines_match(&track, &drifted, 0.0005));
/// ```
pub fn lines_match(a: &[Coordinate], b: &[Coordinate], tolerance: f64) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    if tolerance.is_nan() || tolerance < 0.0 {
        return false;
    }
    if !a.iter().chain(b).all(is_finite) {
        return false;
    }

    // Cheap rejection: each track must sit inside the other's grown bounds
    if let (Some(bounds_a), Some(bounds_b)) = (Bounds::from_points(a), Bounds::from_points(b)) {
        if !bounds_a.expand(tolerance).contains(&bounds_b)
            || !bounds_b.expand(tolerance).contains(&bounds_a)
        {
            return false;
        }
    }

    unmatched_segments(a, b, tolerance).is_empty() && unmatched_segments(b, a, tolerance).is_empty()
}

/// Find the parts of `track` farther than `tolerance` from every segment of `reference`.
///
/// Directed: an empty result means `track` is covered by `reference`, not the
/// reverse. An empty or single-point `reference` leaves every segment of
/// `track` unmatched.
pub fn unmatched_segments(
    track: &[Coordinate],
    reference: &[Coordinate],
    tolerance: f64,
) -> Vec<Segment> {
    let index: RTree<IndexedSegment> = RTree::bulk_load(
        reference
            .windows(2)
            .map(|w| IndexedSegment {
                start: to_coord(&w[0]),
                end: to_coord(&w[1]),
            })
            .collect(),
    );

    let mut unmatched = Vec::new();

    for w in track.windows(2) {
        let a = to_coord(&w[0]);
        let b = to_coord(&w[1]);
        let length = norm(b - a);

        let search_bounds = AABB::from_corners(
            [a.x.min(b.x) - tolerance, a.y.min(b.y) - tolerance],
            [a.x.max(b.x) + tolerance, a.y.max(b.y) + tolerance],
        );

        let mut covered: Vec<(f64, f64)> = index
            .locate_in_envelope_intersecting(&search_bounds)
            .filter_map(|s| covered_interval(a, b, s.start, s.end, tolerance))
            .collect();

        for (t0, t1) in uncovered_gaps(&mut covered) {
            // A zero-length segment is a single point: report it if uncovered at all
            if length == 0.0 || (t1 - t0) * length > MIN_GAP {
                unmatched.push(Segment {
                    start: to_coordinate(lerp(a, b, t0)),
                    end: to_coordinate(lerp(a, b, t1)),
                });
            }
        }
    }

    unmatched
}

/// Parameter interval of segment `a`-`b` inside the capsule of radius `r` around `q0`-`q1`.
fn covered_interval(a: Coord, b: Coord, q0: Coord, q1: Coord, r: f64) -> Option<(f64, f64)> {
    let d = b - a;
    if dot(d, d) == 0.0 {
        return (point_segment_distance_sq(a, q0, q1) <= r * r).then_some((0.0, 1.0));
    }

    // The capsule is the union of two end disks and a band; their traces on
    // the line overlap, so the union is one interval.
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (l, h) in [
        disk_interval(a, d, q0, r),
        disk_interval(a, d, q1, r),
        band_interval(a, d, q0, q1, r),
    ]
    .into_iter()
    .flatten()
    {
        lo = lo.min(l);
        hi = hi.max(h);
    }

    let lo = lo.max(0.0);
    let hi = hi.min(1.0);
    (lo <= hi).then_some((lo, hi))
}

/// Values of t where |a + t·d - center| <= r. Requires d to be non-zero.
fn disk_interval(a: Coord, d: Coord, center: Coord, r: f64) -> Option<(f64, f64)> {
    let f = a - center;
    let qa = dot(d, d);
    let qb = 2.0 * dot(d, f);
    let qc = dot(f, f) - r * r;

    let discriminant = qb * qb - 4.0 * qa * qc;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    Some(((-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)))
}

/// Values of t where a + t·d lies in the rectangle of half-width r along `q0`-`q1`.
fn band_interval(a: Coord, d: Coord, q0: Coord, q1: Coord, r: f64) -> Option<(f64, f64)> {
    let e = q1 - q0;
    let ee = dot(e, e);
    if ee == 0.0 {
        return None;
    }
    let len = ee.sqrt();
    let f = a - q0;

    // Projection along the segment must stay within [0, 1]
    let along = clip_linear(dot(f, e) / ee, dot(d, e) / ee, 0.0, 1.0)?;
    // Signed offset from the segment must stay within [-r, r]
    let across = clip_linear(cross(e, f) / len, cross(e, d) / len, -r, r)?;

    let lo = along.0.max(across.0);
    let hi = along.1.min(across.1);
    (lo <= hi).then_some((lo, hi))
}

/// Values of t where lo <= f0 + t·df <= hi.
fn clip_linear(f0: f64, df: f64, lo: f64, hi: f64) -> Option<(f64, f64)> {
    if df == 0.0 {
        return (lo <= f0 && f0 <= hi).then_some((f64::NEG_INFINITY, f64::INFINITY));
    }
    let t0 = (lo - f0) / df;
    let t1 = (hi - f0) / df;
    Some((t0.min(t1), t0.max(t1)))
}

/// Complement of the covered intervals within [0, 1].
fn uncovered_gaps(covered: &mut [(f64, f64)]) -> Vec<(f64, f64)> {
    covered.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut gaps = Vec::new();
    let mut reach = 0.0_f64;
    for &(lo, hi) in covered.iter() {
        if lo > reach {
            gaps.push((reach, lo));
        }
        reach = reach.max(hi);
    }
    if reach < 1.0 {
        gaps.push((reach, 1.0));
    }
    gaps
}

fn point_segment_distance_sq(p: Coord, q0: Coord, q1: Coord) -> f64 {
    let e = q1 - q0;
    let ee = dot(e, e);
    let t = if ee == 0.0 {
        0.0
    } else {
        (dot(p - q0, e) / ee).clamp(0.0, 1.0)
    };
    let offset = p - lerp(q0, q1, t);
    dot(offset, offset)
}

fn dot(u: Coord, v: Coord) -> f64 {
    u.x * v.x + u.y * v.y
}

fn cross(u: Coord, v: Coord) -> f64 {
    u.x * v.y - u.y * v.x
}

fn norm(u: Coord) -> f64 {
    dot(u, u).sqrt()
}

fn lerp(a: Coord, b: Coord, t: f64) -> Coord {
    a + (b - a) * t
}

fn is_finite(p: &Coordinate) -> bool {
    p.latitude.is_finite() && p.longitude.is_finite()
}

fn to_coord(p: &Coordinate) -> Coord {
    Coord {
        x: p.longitude,
        y: p.latitude,
    }
}

fn to_coordinate(c: Coord) -> Coordinate {
    Coordinate::new(c.y, c.x)
}
