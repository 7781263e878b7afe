//! Owned, serializable copies of tree nodes.
//!
//! [`NodeSnapshot`] mirrors one node and its entire subtree so that
//! presentation layers can consume the tree as JSON without holding a
//! reference into the model.

use serde::Serialize;

use super::node::{AttributePair, NodeKind};
use super::{HierarchyTree, NodeId, Rect};

/// A node and its subtree.
///
/// `window_name` and `rotation` are only present for the root window;
/// `bounds` only for elements with a valid `bounds` attribute.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: &'static str,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Rect>,
    pub attributes: Vec<AttributePair>,
    pub depth: usize,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Snapshot `id` and, when `recursive`, all of its descendants.
    ///
    /// Returns `None` if `id` is not part of `tree`.
    pub fn capture(tree: &HierarchyTree, id: NodeId, recursive: bool) -> Option<Self> {
        let depth = tree.depth(id);
        Self::walk(tree, id, depth, recursive)
    }

    fn walk(tree: &HierarchyTree, id: NodeId, depth: usize, recursive: bool) -> Option<Self> {
        let node = tree.get(id)?;

        let (window_name, rotation) = match node.kind() {
            NodeKind::RootWindow(window) => {
                (Some(window.window_name().to_owned()), Some(window.rotation()))
            }
            NodeKind::UiElement(_) => (None, None),
        };

        let children = if recursive {
            node.children()
                .iter()
                .filter_map(|&child| Self::walk(tree, child, depth + 1, true))
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            id,
            kind: node.kind().type_name(),
            label: node.to_string(),
            window_name,
            rotation,
            bounds: node.bounds(),
            attributes: node.attribute_pairs().to_vec(),
            depth,
            children,
        })
    }
}

impl HierarchyTree {
    /// Snapshot of the whole tree.
    pub fn snapshot(&self) -> Option<NodeSnapshot> {
        NodeSnapshot::capture(self, self.root(), true)
    }
}
