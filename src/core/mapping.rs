//! Affine mapping between two numeric ranges.
//!
//! The tile index uses these to go from projected metres to tile-grid
//! coordinates and back.

use crate::{core::geo::Point, MapError, Result};

/// One-dimensional affine map `from -> to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMapper {
    k: f64,
    b: f64,
    from0: f64,
    to0: f64,
}

impl LinearMapper {
    /// Builds the mapping taking `from[0] -> to[0]` and `from[1] -> to[1]`.
    ///
    /// Fails with [`MapError::DegenerateRange`] when either range has zero
    /// width, since the map (or its inverse) would not exist.
    pub fn new(from: [f64; 2], to: [f64; 2]) -> Result<Self> {
        let d = from[1] - from[0];
        if d == 0.0 || !d.is_finite() || to[1] == to[0] || !(to[1] - to[0]).is_finite() {
            return Err(MapError::DegenerateRange { from, to });
        }
        Ok(Self {
            k: (to[1] - to[0]) / d,
            b: (to[0] * from[1] - to[1] * from[0]) / d,
            from0: from[0],
            to0: to[0],
        })
    }

    /// Maps `from` onto `[0, 1]`
    pub fn unit(from: [f64; 2]) -> Result<Self> {
        Self::new(from, [0.0, 1.0])
    }

    pub fn slope(&self) -> f64 {
        self.k
    }

    pub fn intercept(&self) -> f64 {
        self.b
    }

    /// From the source range into the target range
    pub fn forward(&self, v: f64) -> f64 {
        self.to0 + (v - self.from0) * self.k
    }

    /// From the target range back into the source range.
    ///
    /// Anchored on the range start rather than the intercept, which would
    /// cancel against `v` when the slope is tiny.
    pub fn backward(&self, v: f64) -> f64 {
        self.from0 + (v - self.to0) / self.k
    }
}

/// Independent x and y mappers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMapper2D {
    x: LinearMapper,
    y: LinearMapper,
}

impl LinearMapper2D {
    pub fn new(from: [[f64; 2]; 2], to: [[f64; 2]; 2]) -> Result<Self> {
        Ok(Self {
            x: LinearMapper::new(from[0], to[0])?,
            y: LinearMapper::new(from[1], to[1])?,
        })
    }

    pub fn forward(&self, p: Point) -> Point {
        Point::new(self.x.forward(p.x), self.y.forward(p.y))
    }

    pub fn backward(&self, p: Point) -> Point {
        Point::new(self.x.backward(p.x), self.y.backward(p.y))
    }
}
