//! Spherical pseudo-Mercator projection (EPSG:3857).
//!
//! Pure functions between geographic degrees and projected metres, plus the
//! zoom <-> scale relation used by the viewport. Latitudes at or beyond ±90°
//! diverge; callers clamp with [`GeoPoint::clamp_lat`] when they need finite output.

use std::f64::consts::PI;

use crate::core::{
    constants::{EARTH_RADIUS, SCALE_UNIT},
    geo::{GeoPoint, Point},
};

const DEG: f64 = PI / 180.0;

/// Longitude (degrees) to projected x (metres)
pub fn lon_to_x(lon: f64) -> f64 {
    EARTH_RADIUS * DEG * lon
}

/// Latitude (degrees) to projected y (metres)
pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * DEG).sin();
    EARTH_RADIUS / 2.0 * ((1.0 + sin) / (1.0 - sin)).ln()
}

/// Projected x (metres) to longitude (degrees)
pub fn x_to_lon(x: f64) -> f64 {
    x / (EARTH_RADIUS * DEG)
}

/// Projected y (metres) to latitude (degrees)
pub fn y_to_lat(y: f64) -> f64 {
    (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0) / DEG
}

pub fn project(point: &GeoPoint) -> Point {
    Point::new(lon_to_x(point.lon), lat_to_y(point.lat))
}

pub fn unproject(point: &Point) -> GeoPoint {
    GeoPoint::new(x_to_lon(point.x), y_to_lat(point.y))
}

/// Pixels per projected metre at `zoom`
pub fn scale_for_zoom(zoom: f64) -> f64 {
    SCALE_UNIT * 2_f64.powf(zoom)
}

/// Inverse of [`scale_for_zoom`]
pub fn zoom_for_scale(scale: f64) -> f64 {
    (scale / SCALE_UNIT).log2()
}
