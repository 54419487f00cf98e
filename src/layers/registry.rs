use std::rc::{Rc, Weak};

use log::{debug, warn};

use crate::{
    layers::base::{
        Capabilities, ElementContext, ElementHandle, LifecycleEvent, RegistryToken,
    },
    prelude::HashMap,
    scene::{NodeId, NodeKind, SceneGraph},
    MapError, Result,
};

/// Named elements of one map, in insertion order
pub struct ElementRegistry {
    token: Rc<RegistryToken>,
    /// Parent of every element root node
    parent: Option<NodeId>,
    elements: HashMap<String, ElementHandle>,
    order: Vec<String>,
}

impl ElementRegistry {
    pub fn new(parent: Option<NodeId>) -> Self {
        Self {
            token: Rc::new(RegistryToken),
            parent,
            elements: HashMap::default(),
            order: Vec::new(),
        }
    }

    /// Attaches an element.
    ///
    /// Adding an element that is already registered here is a no-op. On
    /// success the element gets its root group node and, if it listens for
    /// zoom ends, one initial `on_zoom_end` so it can draw for the current
    /// view. Nothing changes when an error is returned.
    pub fn add(&mut self, element: ElementHandle, ctx: &mut ElementContext<'_>) -> Result<()> {
        let (name, capabilities, visible) = {
            let el = element.try_borrow().map_err(|_| MapError::ElementBusy {
                name: "<unknown>".to_string(),
            })?;
            let props = el.properties();
            if props.is_owned_by(&self.token) {
                return Ok(());
            }
            if props.is_attached() {
                return Err(MapError::AlreadyOwned {
                    name: props.name.clone(),
                });
            }
            (props.name.clone(), el.capabilities(), props.visible)
        };
        if self.elements.contains_key(&name) {
            return Err(MapError::DuplicateName { name });
        }

        let root = ctx.scene.add_node(self.parent, NodeKind::Group);
        if !visible {
            ctx.scene.set_visible(root, false);
        }
        {
            let mut el = element.borrow_mut();
            let props = el.properties_mut();
            props.root = Some(root);
            props.owner = Rc::downgrade(&self.token);
        }
        self.elements.insert(name.clone(), element.clone());
        self.order.push(name.clone());
        debug!("attached element '{}' ({:?})", name, root);

        if capabilities.contains(Capabilities::ON_ZOOM_END) {
            element.borrow_mut().on_zoom_end(ctx);
        }
        Ok(())
    }

    /// Detaches the element called `name`, removing its scene subtree.
    ///
    /// Returns the handle, or `None` if no such element exists. Fails with
    /// [`MapError::ElementBusy`] while the element is borrowed, leaving it
    /// attached.
    pub fn remove(
        &mut self,
        name: &str,
        scene: &mut dyn SceneGraph,
    ) -> Result<Option<ElementHandle>> {
        let Some(element) = self.elements.get(name).cloned() else {
            return Ok(None);
        };
        {
            let mut el = element.try_borrow_mut().map_err(|_| MapError::ElementBusy {
                name: name.to_string(),
            })?;
            let props = el.properties_mut();
            if let Some(root) = props.root.take() {
                scene.remove_node(root);
            }
            props.owner = Weak::new();
            el.reset();
        }
        self.elements.remove(name);
        self.order.retain(|n| n != name);
        debug!("detached element '{}'", name);
        Ok(Some(element))
    }

    /// Delivers `event` to every element listening for it, in insertion order
    pub fn broadcast(&self, event: LifecycleEvent, ctx: &mut ElementContext<'_>) {
        let capability = event.capability();
        for name in &self.order {
            let Some(element) = self.elements.get(name) else {
                continue;
            };
            let Ok(mut el) = element.try_borrow_mut() else {
                warn!("skipping {} for element '{}': already borrowed", event, name);
                continue;
            };
            if el.capabilities().contains(capability) {
                el.dispatch(event, ctx);
            }
        }
    }

    /// Shows or hides an element. Showing refreshes its zoom dependent state
    /// through `on_zoom_end`. Returns false for unknown names and
    /// [`MapError::ElementBusy`] while the element is borrowed.
    pub fn set_visible(
        &self,
        name: &str,
        visible: bool,
        ctx: &mut ElementContext<'_>,
    ) -> Result<bool> {
        let Some(element) = self.elements.get(name) else {
            return Ok(false);
        };
        let mut el = element.try_borrow_mut().map_err(|_| MapError::ElementBusy {
            name: name.to_string(),
        })?;
        el.properties_mut().visible = visible;
        if let Some(root) = el.root() {
            ctx.scene.set_visible(root, visible);
        }
        if visible && el.capabilities().contains(Capabilities::ON_ZOOM_END) {
            el.on_zoom_end(ctx);
        }
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<ElementHandle> {
        self.elements.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    /// Element names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
