//! Raster tile layer.
//!
//! The layer keeps one retained set of tiles for the current tile zoom and
//! brings it in line with the viewport after the view settles:
//! - tiles entering the visible range get a placeholder node and a fetch
//! - tiles leaving it are evicted at once, or after a short fade when the
//!   tile zoom changed
//! - fetch results that arrive for evicted tiles are dropped

pub mod grid;
pub mod layer;
pub mod types;

pub use grid::{TileGrid, TileRange};
pub use layer::TileLayer;
pub use types::{FadingLevel, FetchResult, TileLevel, TileRecord, TileState};
