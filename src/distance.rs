// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;

/// Length of one degree of latitude, in meters.
const ONE_DEGREE: f64 = 1000.0 * 10000.8 / 90.0;

/// Calculates the distance between two lat-lon positions, in meters.
///
/// Uses the equirectangular approximation: longitude differences are scaled by
/// the cosine of the first latitude and the result is treated as planar.
/// This is accurate enough for the short (sub-kilometer) distances
/// between neighboring road nodes.
pub fn earth_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let scale = lat1.to_radians().cos();
    let dlat = lat1 - lat2;
    let dlon = (lon1 - lon2) * scale;
    (dlat * dlat + dlon * dlon).sqrt() * ONE_DEGREE
}

/// Distance between two [Nodes](Node), in meters. See [earth_distance].
#[inline]
pub fn node_distance(a: &Node, b: &Node) -> f64 {
    earth_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Heading from one [Node] to another, in degrees clockwise from north,
/// in the range (-180°, 180°].
///
/// Coordinates are not scaled by latitude; this is a spherical approximation
/// shared by every angle computed in this crate.
pub fn bearing(from: &Node, to: &Node) -> f64 {
    (to.lon - from.lon).atan2(to.lat - from.lat).to_degrees()
}

/// Normalizes the difference between a heading and a reference heading
/// into (-180°, 180°]. Positive values are to the right of the reference.
pub fn relative_angle(heading: f64, reference: f64) -> f64 {
    let angle = (heading - reference).rem_euclid(360.0);
    if angle > 180.0 {
        angle - 360.0
    } else {
        angle
    }
}

/// Returns how far (in degrees) a heading is from exactly reversing
/// the reference heading. Zero means a perfect U-turn.
pub fn reciprocal_deviation(heading: f64, reference: f64) -> f64 {
    (180.0 - (heading - reference).rem_euclid(360.0)).abs()
}
