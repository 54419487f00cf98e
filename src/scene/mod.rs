//! Scene-graph seam.
//!
//! The core never paints anything itself. It builds and mutates a retained
//! tree of nodes through [`SceneGraph`]; a rendering backend implements the
//! trait. [`MemoryScene`] is a backend-free implementation that simply keeps
//! the tree, used by headless hosts and tests.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::{core::geo::Point, prelude::Arc};

pub use memory::{MemoryScene, SceneNode};

/// Opaque, already fetched image bytes. Decoding belongs to the backend.
pub type Bitmap = Arc<Vec<u8>>;

/// Handle of a node owned by a scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Affine node transform: `screen = (x + scale_x·px, y + scale_y·py)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTransform {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl NodeTransform {
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Stroke styling of a path node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStyle {
    pub stroke: String,
    pub line_width: f64,
    /// Keep the stroke width constant in screen pixels regardless of zoom
    pub stroke_no_scale: bool,
}

/// What a node draws
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure container
    Group,
    /// Solid rectangle in the parent's coordinate space
    Rect {
        width: f64,
        height: f64,
        fill: String,
    },
    /// Image placeholder; the bitmap is attached later with [`SceneGraph::set_image`]
    Image {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        z: i32,
        /// Mirror vertically, for images placed in a y-up world
        flip_y: bool,
    },
    /// One compound path made of several open polylines
    Path {
        paths: Vec<Vec<Point>>,
        style: PathStyle,
        z: i32,
    },
}

/// Operations the core issues against the rendering backend
pub trait SceneGraph {
    /// Adds a node under `parent` (or as a top-level node)
    fn add_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId;

    /// Removes a node together with its whole subtree. Unknown ids are ignored.
    fn remove_node(&mut self, node: NodeId);

    fn set_transform(&mut self, node: NodeId, transform: NodeTransform);

    fn set_visible(&mut self, node: NodeId, visible: bool);

    /// Fills an image node with its bitmap
    fn set_image(&mut self, node: NodeId, bitmap: Bitmap);

    fn set_pixel_ratio(&mut self, ratio: f64);
}
