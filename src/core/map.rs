use log::{debug, trace};

use crate::{
    core::{
        animation::ZoomAnimation,
        config::MapOptions,
        geo::{GeoPoint, Point},
        viewport::Viewport,
    },
    input::{EventHandled, InputEvent},
    layers::{
        base::{Element, ElementContext, ElementHandle, LifecycleEvent},
        registry::ElementRegistry,
    },
    prelude::{Duration, Instant},
    scene::{MemoryScene, NodeId, NodeKind, NodeTransform, SceneGraph},
    Result,
};

/// Zoom changes below this are reported as moves
const ZOOM_CHANGE_EPSILON: f64 = 1e-9;

/// The map: owns the viewport, the element registry and the scene graph.
///
/// All mutations run to completion inside one call and take the current time
/// explicitly; the host calls [`tick`](Map::tick) once per frame to advance
/// zoom transitions and let elements do their per-frame work.
pub struct Map<S: SceneGraph> {
    options: MapOptions,
    viewport: Viewport,
    scene: S,
    /// Group carrying the world transform; element roots hang below it
    root: NodeId,
    background: Option<NodeId>,
    registry: ElementRegistry,
    animation: Option<ZoomAnimation>,
}

impl Map<MemoryScene> {
    /// A map drawing into an in-memory scene
    pub fn headless(size: Point, options: MapOptions) -> Result<Self> {
        Self::new(size, options, MemoryScene::new())
    }
}

impl<S: SceneGraph> Map<S> {
    pub fn new(size: Point, options: MapOptions, mut scene: S) -> Result<Self> {
        options.validate()?;
        let mut viewport = Viewport::new(size, options.min_zoom, options.max_zoom)?;
        viewport.set_view(options.center, options.zoom);

        scene.set_pixel_ratio(options.pixel_ratio);
        // Added first so it stays beneath the world group
        let background = options.background_color.as_ref().map(|fill| {
            scene.add_node(
                None,
                NodeKind::Rect {
                    width: 1.0,
                    height: 1.0,
                    fill: fill.clone(),
                },
            )
        });
        let root = scene.add_node(None, NodeKind::Group);

        let mut map = Self {
            options,
            viewport,
            scene,
            root,
            background,
            registry: ElementRegistry::new(Some(root)),
            animation: None,
        };
        map.sync_background();
        map.sync_transform();
        Ok(map)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// The group node carrying the world transform
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn elements(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn element(&self, name: &str) -> Option<ElementHandle> {
        self.registry.get(name)
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn center(&self) -> GeoPoint {
        self.viewport.center()
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    /// Attaches an element; see [`ElementRegistry::add`]
    pub fn add_element(&mut self, element: ElementHandle, now: Instant) -> Result<()> {
        let mut ctx = ElementContext::new(&self.viewport, &mut self.scene, now);
        self.registry.add(element, &mut ctx)
    }

    /// Detaches an element; see [`ElementRegistry::remove`]
    pub fn remove_element(&mut self, name: &str) -> Result<Option<ElementHandle>> {
        self.registry.remove(name, &mut self.scene)
    }

    /// Runs `f` on the element called `name` with a context for this map,
    /// e.g. to refresh a tile layer or replace boundary data
    pub fn with_element_mut<E, F, R>(&mut self, name: &str, now: Instant, f: F) -> Option<R>
    where
        E: Element,
        F: FnOnce(&mut E, &mut ElementContext<'_>) -> R,
    {
        let element = self.registry.get(name)?;
        let mut el = element.try_borrow_mut().ok()?;
        let typed = el.as_any_mut().downcast_mut::<E>()?;
        let mut ctx = ElementContext::new(&self.viewport, &mut self.scene, now);
        Some(f(typed, &mut ctx))
    }

    /// Shows or hides an element's nodes. Returns false for unknown names.
    pub fn set_element_visible(
        &mut self,
        name: &str,
        visible: bool,
        now: Instant,
    ) -> Result<bool> {
        let mut ctx = ElementContext::new(&self.viewport, &mut self.scene, now);
        self.registry.set_visible(name, visible, &mut ctx)
    }

    /// Moves the view to `center` at `zoom` (clamped) without animation
    pub fn set_view(&mut self, center: GeoPoint, zoom: f64, now: Instant) {
        self.finish_animation(now);
        let before = self.viewport.zoom();
        self.viewport.set_view(center, zoom);
        self.sync_transform();
        debug!(
            "view set to ({:.5}, {:.5}) at zoom {:.2}",
            center.lon,
            center.lat,
            self.viewport.zoom()
        );

        if (self.viewport.zoom() - before).abs() > ZOOM_CHANGE_EPSILON {
            self.broadcast(LifecycleEvent::ZoomStart, now);
            self.broadcast(LifecycleEvent::ZoomEnd, now);
        } else {
            self.broadcast(LifecycleEvent::Move, now);
            self.broadcast(LifecycleEvent::MoveEnd, now);
        }
    }

    /// Pans by a pixel delta
    pub fn pan(&mut self, delta: Point, now: Instant) -> EventHandled {
        if !self.options.pannable {
            return EventHandled::NotHandled;
        }
        self.finish_animation(now);
        self.viewport.pan(delta);
        self.sync_transform();
        trace!("panned by ({}, {})", delta.x, delta.y);
        self.broadcast(LifecycleEvent::Move, now);
        EventHandled::Handled
    }

    /// Ends a drag gesture
    pub fn end_pan(&mut self, now: Instant) -> EventHandled {
        if !self.options.pannable {
            return EventHandled::NotHandled;
        }
        self.broadcast(LifecycleEvent::MoveEnd, now);
        EventHandled::Handled
    }

    /// Zooms by `delta` levels keeping the world point under `anchor` fixed.
    ///
    /// With a zero `duration` the new transform applies at once and both
    /// `on_zoom_start` and `on_zoom_end` fire before returning. Otherwise the
    /// transition is driven by [`tick`](Map::tick) and `on_zoom_end` fires
    /// when it completes. A delta that clamps to nothing is ignored.
    pub fn zoom_about(
        &mut self,
        anchor: Point,
        delta: f64,
        duration: Duration,
        now: Instant,
    ) -> EventHandled {
        if !self.options.zoomable {
            return EventHandled::NotHandled;
        }
        self.finish_animation(now);
        let Some(target) = self.viewport.zoom_about(anchor, delta) else {
            return EventHandled::NotHandled;
        };
        debug!(
            "zoom {:.2} -> {:.2} about ({}, {})",
            self.viewport.zoom(),
            target.zoom(),
            anchor.x,
            anchor.y
        );

        self.broadcast(LifecycleEvent::ZoomStart, now);
        if duration.is_zero() {
            self.viewport.apply_state(target);
            self.sync_transform();
            self.broadcast(LifecycleEvent::ZoomEnd, now);
        } else {
            self.animation = Some(ZoomAnimation::new(
                self.viewport.state(),
                target,
                now,
                duration,
                self.options.zoom_easing,
            ));
        }
        EventHandled::Handled
    }

    /// Resizes the canvas keeping the geographic centre
    pub fn resize(&mut self, size: Point, now: Instant) {
        self.finish_animation(now);
        self.viewport.set_size(size);
        self.sync_background();
        self.sync_transform();
        self.broadcast(LifecycleEvent::Move, now);
        self.broadcast(LifecycleEvent::MoveEnd, now);
    }

    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> EventHandled {
        match event {
            InputEvent::Drag { delta } => self.pan(delta, now),
            InputEvent::DragEnd => self.end_pan(now),
            InputEvent::Scroll { delta, position } => self.zoom_about(
                position,
                delta * self.options.zoom_step,
                self.options.zoom_animation_duration(),
                now,
            ),
            InputEvent::Resize { size } => {
                self.resize(size, now);
                EventHandled::Handled
            }
        }
    }

    /// Advances the zoom transition and runs per-frame element work
    pub fn tick(&mut self, now: Instant) {
        if let Some(animation) = &self.animation {
            let finished = animation.is_finished(now);
            self.viewport.apply_state(animation.state_at(now));
            self.sync_transform();
            if finished {
                self.animation = None;
                self.broadcast(LifecycleEvent::ZoomEnd, now);
            }
        }
        self.broadcast(LifecycleEvent::Frame, now);
    }

    /// Completes an in-flight transition at its interpolated state
    fn finish_animation(&mut self, now: Instant) {
        if let Some(animation) = self.animation.take() {
            self.viewport.apply_state(animation.state_at(now));
            self.sync_transform();
            self.broadcast(LifecycleEvent::ZoomEnd, now);
        }
    }

    fn broadcast(&mut self, event: LifecycleEvent, now: Instant) {
        let mut ctx = ElementContext::new(&self.viewport, &mut self.scene, now);
        self.registry.broadcast(event, &mut ctx);
    }

    /// Pushes the viewport transform onto the world group
    fn sync_transform(&mut self) {
        let state = self.viewport.state();
        self.scene.set_transform(
            self.root,
            NodeTransform {
                x: state.origin.x,
                y: state.origin.y,
                scale_x: state.scale,
                scale_y: -state.scale,
            },
        );
    }

    fn sync_background(&mut self) {
        if let Some(background) = self.background {
            let size = self.viewport.size();
            self.scene.set_transform(
                background,
                NodeTransform {
                    x: 0.0,
                    y: 0.0,
                    scale_x: size.x,
                    scale_y: size.y,
                },
            );
        }
    }
}
