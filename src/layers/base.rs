use std::{
    any::Any,
    cell::RefCell,
    rc::{Rc, Weak},
};

use bitflags::bitflags;

use crate::{
    core::viewport::Viewport,
    prelude::Instant,
    scene::{NodeId, SceneGraph},
};

bitflags! {
    /// Lifecycle hooks an element wants to receive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const ON_MOVE = 1;
        const ON_MOVE_END = 1 << 1;
        const ON_ZOOM_START = 1 << 2;
        const ON_ZOOM_END = 1 << 3;
        const ON_FRAME = 1 << 4;
    }
}

/// Events broadcast by the map to its elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Move,
    MoveEnd,
    ZoomStart,
    ZoomEnd,
    Frame,
}

impl LifecycleEvent {
    /// The capability an element needs to receive this event
    pub fn capability(self) -> Capabilities {
        match self {
            LifecycleEvent::Move => Capabilities::ON_MOVE,
            LifecycleEvent::MoveEnd => Capabilities::ON_MOVE_END,
            LifecycleEvent::ZoomStart => Capabilities::ON_ZOOM_START,
            LifecycleEvent::ZoomEnd => Capabilities::ON_ZOOM_END,
            LifecycleEvent::Frame => Capabilities::ON_FRAME,
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleEvent::Move => write!(f, "move"),
            LifecycleEvent::MoveEnd => write!(f, "move_end"),
            LifecycleEvent::ZoomStart => write!(f, "zoom_start"),
            LifecycleEvent::ZoomEnd => write!(f, "zoom_end"),
            LifecycleEvent::Frame => write!(f, "frame"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Tile,
    Boundary,
    Custom,
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementType::Tile => write!(f, "tile"),
            ElementType::Boundary => write!(f, "boundary"),
            ElementType::Custom => write!(f, "custom"),
        }
    }
}

/// Identity of a registry. Elements keep a weak reference to the token of
/// the registry that owns them, so ownership ends when the map is dropped.
#[derive(Debug, Default)]
pub struct RegistryToken;

/// Per-attachment state shared by every element
#[derive(Debug, Clone)]
pub struct ElementProperties {
    pub name: String,
    pub element_type: ElementType,
    /// Root group node, present while attached to a map
    pub root: Option<NodeId>,
    pub visible: bool,
    pub(crate) owner: Weak<RegistryToken>,
}

impl ElementProperties {
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            root: None,
            visible: true,
            owner: Weak::new(),
        }
    }

    /// Whether a live map currently owns the element
    pub fn is_attached(&self) -> bool {
        self.owner.strong_count() > 0
    }

    pub(crate) fn is_owned_by(&self, token: &Rc<RegistryToken>) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|owner| Rc::ptr_eq(&owner, token))
    }
}

/// What a hook may touch while it runs.
///
/// Hooks never see the map itself, only the current viewport and the scene
/// graph, so a hook cannot trigger another broadcast.
pub struct ElementContext<'a> {
    pub viewport: &'a Viewport,
    pub scene: &'a mut dyn SceneGraph,
    pub now: Instant,
}

impl<'a> ElementContext<'a> {
    pub fn new(viewport: &'a Viewport, scene: &'a mut dyn SceneGraph, now: Instant) -> Self {
        Self {
            viewport,
            scene,
            now,
        }
    }
}

/// A named overlay attached to a map.
///
/// Elements only receive the hooks listed in [`capabilities`](Element::capabilities).
/// The map creates the element's root node on attach; everything an element
/// draws goes under that root.
pub trait Element: Any {
    fn properties(&self) -> &ElementProperties;

    fn properties_mut(&mut self) -> &mut ElementProperties;

    fn capabilities(&self) -> Capabilities;

    fn name(&self) -> &str {
        &self.properties().name
    }

    fn element_type(&self) -> ElementType {
        self.properties().element_type
    }

    fn root(&self) -> Option<NodeId> {
        self.properties().root
    }

    fn is_visible(&self) -> bool {
        self.properties().visible
    }

    fn on_move(&mut self, _ctx: &mut ElementContext<'_>) {}

    fn on_move_end(&mut self, _ctx: &mut ElementContext<'_>) {}

    fn on_zoom_start(&mut self, _ctx: &mut ElementContext<'_>) {}

    fn on_zoom_end(&mut self, _ctx: &mut ElementContext<'_>) {}

    fn on_frame(&mut self, _ctx: &mut ElementContext<'_>) {}

    /// Drops per-attachment state after the element was removed from its map.
    /// The scene nodes are already gone at this point.
    fn reset(&mut self) {}

    /// Routes `event` to its hook
    fn dispatch(&mut self, event: LifecycleEvent, ctx: &mut ElementContext<'_>) {
        match event {
            LifecycleEvent::Move => self.on_move(ctx),
            LifecycleEvent::MoveEnd => self.on_move_end(ctx),
            LifecycleEvent::ZoomStart => self.on_zoom_start(ctx),
            LifecycleEvent::ZoomEnd => self.on_zoom_end(ctx),
            LifecycleEvent::Frame => self.on_frame(ctx),
        }
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to an element. Identity is the allocation, not the name.
pub type ElementHandle = Rc<RefCell<dyn Element>>;

/// Wraps an element into a handle
pub fn handle<E: Element>(element: E) -> ElementHandle {
    Rc::new(RefCell::new(element))
}

pub fn same_element(a: &ElementHandle, b: &ElementHandle) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// An element without hooks: a named root group for host-managed nodes
pub struct BaseElement {
    pub properties: ElementProperties,
}

impl BaseElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            properties: ElementProperties::new(name, ElementType::Custom),
        }
    }
}

impl Element for BaseElement {
    fn properties(&self) -> &ElementProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut ElementProperties {
        &mut self.properties
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
