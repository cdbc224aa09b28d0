//! Great-circle distance, initial bearing, and compass direction.

use emergency_watch_incident_models::Direction;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine great-circle distance between two points, in kilometres.
#[must_use]
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial bearing from point 1 to point 2, in degrees `[0, 360)` clockwise
/// from true north.
#[must_use]
pub fn get_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let x = delta_lon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos().mul_add(
        lat2_rad.sin(),
        -(lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos()),
    );

    let bearing = x.atan2(y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if bearing >= 360.0 { 0.0 } else { bearing }
}

/// Maps any bearing (negative or beyond 360 included) onto one of the eight
/// 45° compass sectors centred on N, NE, E, ...
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn bearing_to_direction(bearing: f64) -> Direction {
    let normalized = bearing.rem_euclid(360.0);
    let index = (((normalized + 22.5) / 45.0).floor() as usize) % 8;
    Direction::ALL[index]
}
