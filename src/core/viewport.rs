use serde::{Deserialize, Serialize};

use crate::core::{
    geo::{GeoPoint, Point, Rect},
    projection,
};
use crate::{MapError, Result};

/// Zoom changes smaller than this are treated as no change
const ZOOM_EPSILON: f64 = 1e-9;

/// The affine transform from projected space to screen space.
///
/// `screen.x = origin.x + scale·x` and `screen.y = origin.y − scale·y`; the
/// y axis is always flipped because projected y grows northward while screen
/// y grows downward. The zoom level is derived from `scale` and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Screen position of the projected origin (lon 0, lat 0)
    pub origin: Point,
    /// Screen pixels per projected metre
    pub scale: f64,
}

impl ViewportState {
    pub fn zoom(&self) -> f64 {
        projection::zoom_for_scale(self.scale)
    }

    /// Interpolates origin and scale with the same parameter.
    ///
    /// Between two states produced by an anchored zoom, the anchor stays
    /// fixed for every `t`.
    pub fn lerp(&self, other: &ViewportState, t: f64) -> ViewportState {
        ViewportState {
            origin: self.origin.lerp(&other.origin, t),
            scale: self.scale + (other.scale - self.scale) * t,
        }
    }
}

/// Manages the current view of the map: transform, canvas size and zoom limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    state: ViewportState,
    /// The size of the canvas in pixels
    size: Point,
    min_zoom: f64,
    max_zoom: f64,
}

impl Viewport {
    /// Creates a viewport centred on lon 0, lat 0 at `min_zoom`
    pub fn new(size: Point, min_zoom: f64, max_zoom: f64) -> Result<Self> {
        validate_zoom_limits(min_zoom, max_zoom)?;
        let mut viewport = Self {
            state: ViewportState {
                origin: Point::default(),
                scale: projection::scale_for_zoom(min_zoom),
            },
            size,
            min_zoom,
            max_zoom,
        };
        viewport.set_view(GeoPoint::default(), min_zoom);
        Ok(viewport)
    }

    /// Sets centre and zoom. This is the single source of truth for the transform:
    /// the zoom is clamped to the limits and `center` lands on the canvas centre.
    pub fn set_view(&mut self, center: GeoPoint, zoom: f64) {
        let zoom = self.clamp_zoom(zoom);
        let scale = projection::scale_for_zoom(zoom);
        let p = projection::project(&center);
        self.state = ViewportState {
            origin: Point::new(
                self.size.x / 2.0 - p.x * scale,
                self.size.y / 2.0 + p.y * scale,
            ),
            scale,
        };
    }

    /// Translates the transform by a pixel delta; scale is untouched
    pub fn pan(&mut self, delta: Point) {
        self.state.origin = self.state.origin.add(&delta);
    }

    /// Computes the state reached by zooming `zoom_delta` levels about `anchor`.
    ///
    /// The target zoom is clamped to the limits; `None` means the clamped
    /// change is zero and nothing should happen. The world point under
    /// `anchor` is the same before and after. The viewport itself is not
    /// modified, so callers can apply the state at once or animate towards it.
    pub fn zoom_about(&self, anchor: Point, zoom_delta: f64) -> Option<ViewportState> {
        let current = self.zoom();
        let target = self.clamp_zoom(current + zoom_delta);
        if !target.is_finite() || (target - current).abs() < ZOOM_EPSILON {
            return None;
        }

        let scale = projection::scale_for_zoom(target);
        let magnification = scale / self.state.scale;
        let origin = anchor.add(&self.state.origin.subtract(&anchor).multiply(magnification));
        Some(ViewportState { origin, scale })
    }

    pub fn apply_state(&mut self, state: ViewportState) {
        self.state = state;
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    /// Current zoom, derived from the scale.
    ///
    /// A view sitting on a limit reports the limit exactly; the log of the
    /// stored scale can land an ulp to either side of it.
    pub fn zoom(&self) -> f64 {
        let zoom = self.state.zoom();
        if (zoom - self.min_zoom).abs() < ZOOM_EPSILON {
            self.min_zoom
        } else if (zoom - self.max_zoom).abs() < ZOOM_EPSILON {
            self.max_zoom
        } else {
            self.clamp_zoom(zoom)
        }
    }

    pub fn size(&self) -> Point {
        self.size
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    /// Resizes the canvas, keeping the geographic centre and the scale
    pub fn set_size(&mut self, size: Point) {
        let center = self.screen_to_projected(self.size.multiply(0.5));
        self.size = size;
        self.state.origin = Point::new(
            size.x / 2.0 - center.x * self.state.scale,
            size.y / 2.0 + center.y * self.state.scale,
        );
    }

    /// Changes the zoom limits, re-clamping the current view
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) -> Result<()> {
        validate_zoom_limits(min_zoom, max_zoom)?;
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        let zoom = self.state.zoom();
        if zoom < min_zoom || zoom > max_zoom {
            let center = self.center();
            self.set_view(center, zoom);
        }
        Ok(())
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn screen_to_projected(&self, p: Point) -> Point {
        let ViewportState { origin, scale } = self.state;
        Point::new((p.x - origin.x) / scale, (origin.y - p.y) / scale)
    }

    pub fn projected_to_screen(&self, p: Point) -> Point {
        let ViewportState { origin, scale } = self.state;
        Point::new(origin.x + scale * p.x, origin.y - scale * p.y)
    }

    pub fn screen_to_geo(&self, p: Point) -> GeoPoint {
        projection::unproject(&self.screen_to_projected(p))
    }

    pub fn geo_to_screen(&self, g: &GeoPoint) -> Point {
        self.projected_to_screen(projection::project(g))
    }

    /// Geographic point currently under the canvas centre
    pub fn center(&self) -> GeoPoint {
        self.screen_to_geo(self.size.multiply(0.5))
    }

    /// Visible area in projected metres
    pub fn visible_projected_bounds(&self) -> Rect {
        Rect::new(
            self.screen_to_projected(Point::new(0.0, self.size.y)),
            self.screen_to_projected(Point::new(self.size.x, 0.0)),
        )
    }
}

fn validate_zoom_limits(min_zoom: f64, max_zoom: f64) -> Result<()> {
    if !min_zoom.is_finite() || !max_zoom.is_finite() {
        return Err(MapError::InvalidConfig(format!(
            "zoom limits must be finite, got [{min_zoom}, {max_zoom}]"
        )));
    }
    if min_zoom < 0.0 || min_zoom > max_zoom {
        return Err(MapError::InvalidConfig(format!(
            "invalid zoom limits [{min_zoom}, {max_zoom}]"
        )));
    }
    Ok(())
}
