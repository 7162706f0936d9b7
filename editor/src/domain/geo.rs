//! Geodesic helpers for element positions.
//!
//! Distances are great-circle (haversine) metres from the `geo` crate.
//! Interpolation along a segment is linear in degrees, which is accurate
//! enough at the scale of a single platform or building.

use ::geo::{Distance, Haversine, Point};

use super::element::LonLat;

/// Great-circle distance between two positions, in metres.
pub fn great_circle_distance(from: LonLat, to: LonLat) -> f64 {
    Haversine.distance(Point::new(from.lon, from.lat), Point::new(to.lon, to.lat))
}

/// Centre of the axis-aligned bounding box around `points`.
pub fn bounding_box_center(points: &[LonLat]) -> Option<LonLat> {
    let first = points.first()?;
    let (min, max) = points
        .iter()
        .fold((*first, *first), |(min, max), point| {
            (
                LonLat::new(min.lon.min(point.lon), min.lat.min(point.lat)),
                LonLat::new(max.lon.max(point.lon), max.lat.max(point.lat)),
            )
        });
    Some(LonLat::new(
        (min.lon + max.lon) / 2.0,
        (min.lat + max.lat) / 2.0,
    ))
}

/// Point halfway along the path by cumulative great-circle distance.
///
/// A single point is its own midpoint. A path of zero total length resolves
/// to its first point.
///
/// # Examples
/// ```
/// use osm_gtfs_editor::domain::{LonLat, geo::path_midpoint};
///
/// let path = [LonLat::new(0.0, 0.0), LonLat::new(1.0, 0.0), LonLat::new(2.0, 0.0)];
/// let mid = path_midpoint(&path).expect("non-empty path");
/// assert!((mid.lon - 1.0).abs() < 1e-9);
/// ```
pub fn path_midpoint(points: &[LonLat]) -> Option<LonLat> {
    let first = *points.first()?;
    let segments = points
        .windows(2)
        .filter_map(|pair| match pair {
            [start, end] => Some((*start, *end, great_circle_distance(*start, *end))),
            _ => None,
        })
        .collect::<Vec<_>>();
    let total: f64 = segments.iter().map(|(_, _, length)| length).sum();
    if total <= 0.0 {
        return Some(first);
    }

    let half = total / 2.0;
    let mut walked = 0.0_f64;
    for (start, end, length) in &segments {
        if walked + length >= half {
            let fraction = if *length > 0.0 {
                (half - walked) / length
            } else {
                0.0
            };
            return Some(interpolate(*start, *end, fraction));
        }
        walked += length;
    }
    points.last().copied()
}

fn interpolate(start: LonLat, end: LonLat, fraction: f64) -> LonLat {
    LonLat::new(
        start.lon + (end.lon - start.lon) * fraction,
        start.lat + (end.lat - start.lat) * fraction,
    )
}
