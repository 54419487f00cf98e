//! Prelude module for common slippymap types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use slippymap::prelude::*;`

pub use crate::core::{
    animation::{EasingType, ZoomAnimation},
    config::{BoundaryOptions, MapOptions, TileLayerOptions},
    geo::{GeoPoint, Point, Rect, TileKey},
    map::Map,
    mapping::{LinearMapper, LinearMapper2D},
    projection,
    viewport::{Viewport, ViewportState},
};

pub use crate::layers::{
    base::{
        handle, BaseElement, Capabilities, Element, ElementContext, ElementHandle,
        ElementProperties, ElementType, LifecycleEvent,
    },
    boundary::{BoundaryLayer, BoundaryStyle},
    registry::ElementRegistry,
    tile::{TileLayer, TileState},
};

pub use crate::data::geojson::{GeoJson, GeoJsonFeature, GeoJsonGeometry};

pub use crate::input::{EventHandled, InputEvent};

pub use crate::scene::{Bitmap, MemoryScene, NodeId, NodeKind, NodeTransform, SceneGraph};

pub use crate::tiles::{BitmapFetcher, HttpFetcher};

pub use crate::runtime::{
    AsyncSpawner, Debounced, Debouncer, DeferredSpawner, Edge, InlineSpawner,
};

#[cfg(feature = "tokio-runtime")]
pub use crate::runtime::TokioSpawner;

pub use crate::{Error as MapError, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub use instant::Instant;

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
