use super::{Bitmap, NodeId, NodeKind, NodeTransform, SceneGraph};
use crate::prelude::HashMap;

/// A node as stored by [`MemoryScene`]
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub transform: NodeTransform,
    pub visible: bool,
    pub image: Option<Bitmap>,
    pub children: Vec<NodeId>,
}

/// Retained scene tree without any rendering
#[derive(Debug, Default)]
pub struct MemoryScene {
    nodes: HashMap<NodeId, SceneNode>,
    top_level: Vec<NodeId>,
    next_id: u64,
    pixel_ratio: f64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self {
            pixel_ratio: 1.0,
            ..Default::default()
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(&id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Ids of every node below `id`, depth first
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Whether `id` and all of its ancestors are visible
    pub fn is_effectively_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(&current) {
                Some(node) if node.visible => cursor = node.parent,
                _ => return false,
            }
        }
        true
    }
}

impl SceneGraph for MemoryScene {
    fn add_node(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;

        // A stale parent handle degrades to a top-level node
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        match parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.push(id);
                }
            }
            None => self.top_level.push(id),
        }

        self.nodes.insert(
            id,
            SceneNode {
                parent,
                kind,
                transform: NodeTransform::identity(),
                visible: true,
                image: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn remove_node(&mut self, node: NodeId) {
        let Some(removed) = self.nodes.get(&node) else {
            return;
        };
        match removed.parent {
            Some(p) => {
                if let Some(parent_node) = self.nodes.get_mut(&p) {
                    parent_node.children.retain(|c| *c != node);
                }
            }
            None => self.top_level.retain(|c| *c != node),
        }
        for id in self.descendants(node) {
            self.nodes.remove(&id);
        }
        self.nodes.remove(&node);
    }

    fn set_transform(&mut self, node: NodeId, transform: NodeTransform) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.transform = transform;
        }
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.visible = visible;
        }
    }

    fn set_image(&mut self, node: NodeId, bitmap: Bitmap) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.image = Some(bitmap);
        }
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }
}
