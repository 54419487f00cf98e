//! The slippy tile grid of one zoom level.
//!
//! Column `x` grows eastward from the antimeridian, row `y` grows southward
//! from the top of the world square. At zoom `z` there are `2^z` tiles per
//! axis, each `2·MAX / 2^z` projected metres wide.

use crate::{
    core::{
        constants::{MAX_EXTENT, MAX_TILE_ZOOM},
        geo::{Point, Rect, TileKey},
        mapping::LinearMapper2D,
        viewport::Viewport,
    },
    MapError, Result,
};

/// Projected space <-> tile grid at a fixed zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    zoom: u8,
    magnification: i64,
    tile_size: f64,
    mapper: LinearMapper2D,
}

impl TileGrid {
    pub fn new(zoom: u8) -> Result<Self> {
        if zoom > MAX_TILE_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "tile zoom {zoom} is above {MAX_TILE_ZOOM}"
            )));
        }
        let magnification = 1i64 << zoom;
        let mag = magnification as f64;
        let mapper = LinearMapper2D::new(
            [[-MAX_EXTENT, MAX_EXTENT], [MAX_EXTENT, -MAX_EXTENT]],
            [[0.0, mag], [0.0, mag]],
        )?;
        Ok(Self {
            zoom,
            magnification,
            tile_size: 2.0 * MAX_EXTENT / mag,
            mapper,
        })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn magnification(&self) -> i64 {
        self.magnification
    }

    /// Tile edge length in projected metres
    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Fractional grid position of a projected point
    pub fn to_grid(&self, p: Point) -> Point {
        self.mapper.forward(p)
    }

    pub fn to_projected(&self, p: Point) -> Point {
        self.mapper.backward(p)
    }

    /// Tiles covering the visible area of `viewport`.
    ///
    /// The min corner is floored and the max corner ceiled; rows are clamped
    /// to the world, columns are not, so a view across the antimeridian
    /// yields keys of the neighbouring world copy.
    pub fn range(&self, viewport: &Viewport) -> TileRange {
        let size = viewport.size();
        let top_left = self.to_grid(viewport.screen_to_projected(Point::new(0.0, 0.0)));
        let bottom_right = self.to_grid(viewport.screen_to_projected(size));

        let clamp_row = |v: f64| (v as i64).clamp(0, self.magnification);
        TileRange {
            zoom: self.zoom,
            min_x: top_left.x.floor() as i64,
            max_x: bottom_right.x.ceil() as i64,
            min_y: clamp_row(top_left.y.floor()),
            max_y: clamp_row(bottom_right.y.ceil()),
        }
    }

    /// Where tile `key` sits in projected space
    pub fn placement(&self, key: &TileKey) -> Rect {
        let left = self.tile_size * key.x as f64 - MAX_EXTENT;
        let top = MAX_EXTENT - self.tile_size * key.y as f64;
        Rect::new(
            Point::new(left, top - self.tile_size),
            Point::new(left + self.tile_size, top),
        )
    }
}

/// Half-open block of tiles `[min_x, max_x) × [min_y, max_y)` at one zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_x: i64,
    pub max_x: i64,
    pub min_y: i64,
    pub max_y: i64,
}

impl TileRange {
    pub fn contains(&self, key: &TileKey) -> bool {
        key.z == self.zoom
            && key.x >= self.min_x
            && key.x < self.max_x
            && key.y >= self.min_y
            && key.y < self.max_y
    }

    pub fn len(&self) -> usize {
        let w = (self.max_x - self.min_x).max(0) as usize;
        let h = (self.max_y - self.min_y).max(0) as usize;
        w * h
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys row by row
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.min_y..self.max_y)
            .flat_map(move |y| (self.min_x..self.max_x).map(move |x| TileKey::new(x, y, self.zoom)))
    }
}
