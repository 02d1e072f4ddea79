/// Great-circle distance and elevation gain helpers.
///
/// Distances use a 6,371 km sphere, not geo's mean Earth radius.
use geo::{point, Point};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two (lat, lon) pairs given in degrees.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Same as [`distance`] for `geo` points (x = longitude, y = latitude).
pub fn distance_between(a: &Point<f64>, b: &Point<f64>) -> f64 {
    distance(a.y(), a.x(), b.y(), b.x())
}

/// Builds a `geo` point from latitude/longitude in degrees.
pub fn lat_lon(lat: f64, lon: f64) -> Point<f64> {
    point!(x: lon, y: lat)
}

/// Positive part of an elevation delta.
pub fn gain(elevation_delta: f64) -> f64 {
    if elevation_delta > 0.0 {
        elevation_delta
    } else {
        0.0
    }
}
