use serde::{Deserialize, Serialize};

use crate::core::constants::MAX_LATITUDE;

/// A geographical coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    /// Creates a new coordinate from longitude and latitude
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Validates that the coordinates are within the projectable range
    pub fn is_valid(&self) -> bool {
        self.lon >= -180.0 && self.lon <= 180.0 && self.lat > -90.0 && self.lat < 90.0
    }

    /// Wraps longitude to [-180, 180] range
    pub fn wrap_lon(lon: f64) -> f64 {
        let wrapped = lon % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    /// Clamps latitude to the range where the projection stays finite
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

/// Represents a point in screen (pixels, y-down) or projected (metres, y-up) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> Point {
        Point::new(self.x * scalar, self.y * scalar)
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Axis-aligned rectangle in projected space, `min` is the south-west corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point,
    pub max: Point,
}

impl Rect {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

/// Unique identity of a raster tile in the slippy tile grid.
///
/// `x` is the raw grid column and may lie outside `[0, 2^z)` when the view
/// spans a neighbouring world copy; [`TileKey::wrapped_x`] gives the column
/// to request from the tile server. `y` is always within `[0, 2^z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileKey {
    pub fn new(x: i64, y: i64, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Number of tile columns/rows spanning the world at this zoom.
    ///
    /// Tile zooms stop at [`MAX_TILE_ZOOM`](crate::core::constants::MAX_TILE_ZOOM);
    /// a hand-built key beyond 62 saturates at `2^62` instead of overflowing.
    pub fn magnification(&self) -> i64 {
        1i64 << self.z.min(62)
    }

    /// Column wrapped into `[0, 2^z)`
    pub fn wrapped_x(&self) -> i64 {
        self.x.rem_euclid(self.magnification())
    }

    pub fn is_valid(&self) -> bool {
        self.y >= 0 && self.y < self.magnification()
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
