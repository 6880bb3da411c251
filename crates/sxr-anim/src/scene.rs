//! Minimal scene-node hierarchy that skeletons push poses into
//!
//! Rendering engines own their own node types; this is the contract the
//! animation core relies on: a named node with a parent-relative transform
//! and children, shared between the skeleton and whoever renders it.

use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;

/// A named node with a local transform and child nodes
#[derive(Debug)]
pub struct SceneNode {
    name: String,
    transform: Mutex<Mat4>,
    children: Mutex<Vec<Arc<SceneNode>>>,
}

impl SceneNode {
    /// Create a node with an identity transform
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_transform(name, Mat4::IDENTITY)
    }

    pub fn with_transform(name: impl Into<String>, transform: Mat4) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            transform: Mutex::new(transform),
            children: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent-relative transform
    pub fn local_matrix(&self) -> Mat4 {
        *self.transform.lock()
    }

    pub fn set_local_matrix(&self, m: Mat4) {
        *self.transform.lock() = m;
    }

    pub fn add_child(&self, child: Arc<Self>) {
        self.children.lock().push(child);
    }

    /// Snapshot of the direct children
    pub fn children(&self) -> Vec<Arc<Self>> {
        self.children.lock().clone()
    }

    /// Depth-first search for a node by name, starting with this node
    pub fn find_by_name(self: &Arc<Self>, name: &str) -> Option<Arc<Self>> {
        if self.name == name {
            return Some(Arc::clone(self));
        }
        self.children()
            .iter()
            .find_map(|child| child.find_by_name(name))
    }
}
