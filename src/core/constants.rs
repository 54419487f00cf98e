//! Core constants for the pseudo-Mercator world and engine-wide defaults.
//! Keeping them in a single place makes it easier to tweak engine-wide magic numbers.

use std::f64::consts::PI;

/// Earth radius used by the spherical (pseudo) Mercator projection, in metres.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the world extent in projected metres (`π·R`).
/// Projected x and y are both effectively confined to `[-MAX_EXTENT, MAX_EXTENT]`.
pub const MAX_EXTENT: f64 = PI * EARTH_RADIUS;

/// Screen pixels per projected metre at zoom 0.
/// At zoom 0 the whole world is 256 px wide.
pub const SCALE_UNIT: f64 = 128.0 / (EARTH_RADIUS * PI);

/// Latitude beyond which the projection is clamped by callers that need finite values.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Highest tile zoom; `2^z` grid coordinates stay far inside an i64.
pub const MAX_TILE_ZOOM: u8 = 30;

/// Trailing debounce window applied to tile recomputation.
pub const DEFAULT_TILE_DEBOUNCE_MS: u64 = 100;

/// How long the previous zoom level's tiles stay visible after a zoom change.
pub const DEFAULT_ZOOM_FADE_MS: u64 = 100;

/// Wheel notches are multiplied by this to get a zoom delta.
pub const DEFAULT_ZOOM_STEP: f64 = 0.5;

/// Duration of the animated scroll zoom.
pub const DEFAULT_ZOOM_ANIMATION_MS: u64 = 300;
