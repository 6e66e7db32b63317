//! Geographic helpers
//!
//! Provides the distance and heading math used by the tick engine:
//! - Great-circle distance (haversine)
//! - Segment heading
//! - Linear interpolation between waypoints
//! - Meter / kilometer conversion

use crate::route::Coordinate;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (haversine).
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Heading from `a` to `b` in degrees.
///
/// Computed as `atan2(Δlng, Δlat)` on raw degree deltas and not normalized,
/// so westward segments report negative headings (down to -180).
pub fn bearing_degrees(a: Coordinate, b: Coordinate) -> f64 {
    (b.longitude - a.longitude)
        .atan2(b.latitude - a.latitude)
        .to_degrees()
}

/// Linear interpolation from `a` toward `b`; `progress` 0.0 is `a`, 1.0 is `b`.
pub fn interpolate(a: Coordinate, b: Coordinate, progress: f64) -> Coordinate {
    Coordinate {
        latitude: a.latitude + (b.latitude - a.latitude) * progress,
        longitude: a.longitude + (b.longitude - a.longitude) * progress,
    }
}

/// Convert meters to kilometers
pub fn meters_to_km(meters: f64) -> f64 {
    meters / 1000.0
}
