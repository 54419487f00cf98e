pub mod base;
pub mod boundary;
pub mod registry;
pub mod tile;

pub use base::{Capabilities, Element, ElementContext, ElementHandle, LifecycleEvent};
pub use boundary::{BoundaryLayer, BoundaryStyle};
pub use registry::ElementRegistry;
pub use tile::TileLayer;
