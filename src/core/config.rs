//! Map, tile layer and boundary configuration.
//!
//! Every options struct deserializes with `#[serde(default)]`, so a JSON
//! document only needs the fields it wants to change. Call `validate` (or load
//! through `from_json`, which does) before handing options to a constructor.

use serde::{Deserialize, Serialize};

use crate::core::{
    animation::EasingType,
    constants::{
        DEFAULT_TILE_DEBOUNCE_MS, DEFAULT_ZOOM_ANIMATION_MS, DEFAULT_ZOOM_FADE_MS,
        DEFAULT_ZOOM_STEP, MAX_TILE_ZOOM,
    },
    geo::GeoPoint,
};
use crate::prelude::Duration;
use crate::{MapError, Result};

/// OpenStreetMap standard tiles
pub const OSM_URL_TEMPLATE: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Options for creating a map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Initial center of the map
    pub center: GeoPoint,
    /// Initial zoom level
    pub zoom: f64,
    /// Zoom levels per wheel notch
    pub zoom_step: f64,
    /// Duration of wheel zoom transitions, 0 to disable animation
    pub zoom_animation_ms: u64,
    pub zoom_easing: EasingType,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Device pixel ratio forwarded to the scene graph
    pub pixel_ratio: f64,
    /// Fill of the full-canvas background rectangle, none if unset
    pub background_color: Option<String>,
    pub pannable: bool,
    pub zoomable: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(120.0, 30.0),
            zoom: 7.0,
            zoom_step: DEFAULT_ZOOM_STEP,
            zoom_animation_ms: DEFAULT_ZOOM_ANIMATION_MS,
            zoom_easing: EasingType::Linear,
            min_zoom: 3.0,
            max_zoom: 18.0,
            pixel_ratio: 1.0,
            background_color: None,
            pannable: true,
            zoomable: true,
        }
    }
}

impl MapOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min_zoom.is_finite() || !self.max_zoom.is_finite() || self.min_zoom < 0.0 {
            return Err(MapError::InvalidConfig(format!(
                "invalid zoom limits [{}, {}]",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.zoom.is_finite() {
            return Err(MapError::InvalidConfig("zoom must be finite".to_string()));
        }
        if !self.center.is_valid() {
            return Err(MapError::InvalidConfig(format!(
                "center {:?} is outside the projectable range",
                self.center
            )));
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "zoom_step must be positive, got {}",
                self.zoom_step
            )));
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "pixel_ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        Ok(())
    }

    pub fn zoom_animation_duration(&self) -> Duration {
        Duration::from_millis(self.zoom_animation_ms)
    }
}

/// Configuration for a tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLayerOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// URL template with `{s}`, `{x}`, `{y}` and `{z}` placeholders
    pub url: String,
    /// Subdomain letters substituted for `{s}`, one character each
    pub subdomains: String,
    /// Stacking order of the tile images
    pub z_index: i32,
    /// Quiet period after the last move before the tile set is recomputed
    pub update_debounce_ms: u64,
    /// How long the previous zoom level stays visible after a zoom change
    pub zoom_fade_ms: u64,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            min_zoom: 1,
            max_zoom: 18,
            url: OSM_URL_TEMPLATE.to_string(),
            subdomains: "abc".to_string(),
            z_index: 0,
            update_debounce_ms: DEFAULT_TILE_DEBOUNCE_MS,
            zoom_fade_ms: DEFAULT_ZOOM_FADE_MS,
        }
    }
}

impl TileLayerOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_zoom > self.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "tile min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_zoom > MAX_TILE_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "tile max_zoom {} is out of range",
                self.max_zoom
            )));
        }
        if self.url.contains("{s}") && self.subdomains.is_empty() {
            return Err(MapError::InvalidConfig(
                "url uses {s} but no subdomains are configured".to_string(),
            ));
        }
        Ok(())
    }

    pub fn update_debounce(&self) -> Duration {
        Duration::from_millis(self.update_debounce_ms)
    }

    pub fn zoom_fade(&self) -> Duration {
        Duration::from_millis(self.zoom_fade_ms)
    }
}

/// Configuration for a boundary layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryOptions {
    /// Paths are only shown while the map zoom is within these levels
    pub min_zoom_level: f64,
    pub max_zoom_level: f64,
    pub line_color: String,
    pub line_width: f64,
}

impl Default for BoundaryOptions {
    fn default() -> Self {
        Self {
            min_zoom_level: 0.0,
            max_zoom_level: 18.0,
            line_color: "#000000".to_string(),
            line_width: 2.0,
        }
    }
}

impl BoundaryOptions {
    pub fn validate(&self) -> Result<()> {
        if self.min_zoom_level > self.max_zoom_level {
            return Err(MapError::InvalidConfig(format!(
                "boundary min_zoom_level {} is greater than max_zoom_level {}",
                self.min_zoom_level, self.max_zoom_level
            )));
        }
        if !(self.line_width.is_finite() && self.line_width >= 0.0) {
            return Err(MapError::InvalidConfig(format!(
                "invalid line_width {}",
                self.line_width
            )));
        }
        Ok(())
    }

    pub fn is_visible_at(&self, zoom: f64) -> bool {
        zoom >= self.min_zoom_level && zoom <= self.max_zoom_level
    }
}
