//! # slippymap
//!
//! The core of a pan/zoom slippy map: a pseudo-Mercator world, a viewport
//! transform between geographic, projected and screen space, named overlay
//! elements, and a raster tile set kept consistent with the current view.
//!
//! Rendering, image decoding and input recognition are left to the host. The
//! map drives a [`scene::SceneGraph`] implementation and fetches tile bitmaps
//! through a [`tiles::BitmapFetcher`].

pub mod core;
pub mod data;
pub mod input;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod scene;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    config::{BoundaryOptions, MapOptions, TileLayerOptions},
    geo::{GeoPoint, Point, Rect, TileKey},
    map::Map,
    viewport::{Viewport, ViewportState},
};

pub use layers::{
    base::{Capabilities, Element, ElementContext, ElementHandle, LifecycleEvent},
    boundary::BoundaryLayer,
    registry::ElementRegistry,
    tile::TileLayer,
};

pub use input::{EventHandled, InputEvent};

pub use scene::{MemoryScene, NodeId, SceneGraph};

pub use tiles::{BitmapFetcher, HttpFetcher};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Degenerate range: {from:?} -> {to:?}")]
    DegenerateRange { from: [f64; 2], to: [f64; 2] },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Element '{name}' is already attached to another map")]
    AlreadyOwned { name: String },

    #[error("An element named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Element '{name}' is borrowed elsewhere")]
    ElementBusy { name: String },

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Error type alias for convenience
pub type Error = MapError;
