//! Core data types for tile layer functionality

use crate::{
    core::geo::{Rect, TileKey},
    prelude::{HashMap, Instant},
    scene::{Bitmap, NodeId},
    Result,
};

/// Fetch state of a retained tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileState {
    /// Placeholder node exists, bitmap requested
    Pending,
    Loaded,
    /// Fetch failed; the tile is requested again on the next recompute
    Failed,
}

/// A tile of the retained set
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    pub key: TileKey,
    /// Image node under the layer root
    pub node: NodeId,
    /// Placement in projected metres
    pub rect: Rect,
    pub url: String,
    pub state: TileState,
    /// Id of the latest fetch issued for this record
    pub request_id: u64,
}

impl TileRecord {
    pub fn is_loaded(&self) -> bool {
        self.state == TileState::Loaded
    }

    pub fn is_pending(&self) -> bool {
        self.state == TileState::Pending
    }
}

/// All tiles of one tile zoom
#[derive(Debug, Clone, Default)]
pub struct TileLevel {
    pub zoom: u8,
    pub tiles: HashMap<TileKey, TileRecord>,
}

impl TileLevel {
    pub fn new(zoom: u8) -> Self {
        Self {
            zoom,
            tiles: HashMap::default(),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tiles.values().map(|record| record.node)
    }
}

/// A previous zoom level kept on screen until `evict_at`
#[derive(Debug, Clone)]
pub struct FadingLevel {
    pub level: TileLevel,
    pub evict_at: Instant,
}

/// Outcome of one bitmap fetch, sent back to the layer
#[derive(Debug)]
pub struct FetchResult {
    pub key: TileKey,
    pub request_id: u64,
    pub bitmap: Result<Bitmap>,
}
