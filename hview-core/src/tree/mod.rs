//! In-memory hierarchy tree built from a UI dump.
//!
//! [`HierarchyTree`] is an arena: it owns every [`TreeNode`] and hands out
//! [`NodeId`] indices.  Children are owned (by index) in insertion order and
//! each node keeps a non-owning `parent` back-reference that is set exactly
//! once, when the node is attached.
//!
//! # Hit-testing
//!
//! [`HierarchyTree::find_leaf_most_nodes_at_point`] reports the deepest
//! nodes whose bounds cover a point.  Children are visited first; a node only
//! tests itself when none of its children covered the point.  Containment is
//! inclusive on all four edges, so siblings sharing an edge can both match.

pub mod node;
pub mod snapshot;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::errors::HierarchyError;
use node::{AttributePair, NodeKind, UiElement};

/// Deepest nesting accepted from a dump (the root is depth 0).  Tree walks
/// recurse once per level, so deeper input is rejected at parse time.
pub const MAX_TREE_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Screen-space rectangle.  `width` and `height` may be negative when the
/// dump lists the corners in reverse; such values are passed through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

fn bounds_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").expect("bounds pattern is valid")
    })
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Parse a dump `bounds` value of the form `[x0,y0][x1,y1]`.
    pub fn parse_bounds(raw: &str) -> Result<Self, HierarchyError> {
        let invalid = || HierarchyError::InvalidBounds(raw.to_owned());
        let caps = bounds_pattern().captures(raw).ok_or_else(invalid)?;

        let mut coords = [0i32; 4];
        for (slot, group) in coords.iter_mut().zip(1..=4) {
            *slot = caps[group].parse().map_err(|_| invalid())?;
        }
        let [x0, y0, x1, y1] = coords;

        Ok(Self {
            x: x0,
            y: y0,
            width: x1.checked_sub(x0).ok_or_else(invalid)?,
            height: y1.checked_sub(y0).ok_or_else(invalid)?,
        })
    }

    /// Inclusive containment: edge pixels count as inside.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        x <= px && px <= x + i64::from(self.width) && y <= py && py <= y + i64::from(self.height)
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Index of a node inside its [`HierarchyTree`].
///
/// Ids are assigned in creation order, which for parsed dumps is document
/// (depth-first, pre-order) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of the hierarchy.
#[derive(Debug)]
pub struct TreeNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attribute_pairs: OnceLock<Vec<AttributePair>>,
}

impl TreeNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attribute_pairs: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_ui_element(&self) -> Option<&UiElement> {
        match &self.kind {
            NodeKind::UiElement(element) => Some(element),
            NodeKind::RootWindow(_) => None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_child(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn has_bounds(&self) -> bool {
        self.kind.bounds().is_some()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.kind.bounds()
    }

    /// Attribute table for display.  Built on first access and cached; the
    /// tree is read-only once parsed so the cache never goes stale.
    pub fn attribute_pairs(&self) -> &[AttributePair] {
        self.attribute_pairs.get_or_init(|| self.kind.attribute_pairs())
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

/// Owner of every node of one dump.  The first node created is the root.
#[derive(Debug)]
pub struct HierarchyTree {
    nodes: Vec<TreeNode>,
}

impl HierarchyTree {
    /// Create a tree holding only `root`.
    pub fn new(root: NodeKind) -> Self {
        Self {
            nodes: vec![TreeNode::new(root)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    /// Every node id in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Create a detached node.  It has no parent until [`add_child`] is
    /// called for it.
    ///
    /// [`add_child`]: HierarchyTree::add_child
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(TreeNode::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` to `parent`'s children.
    ///
    /// A node can be attached at most once: attaching it again, to the same
    /// or to another parent, fails with [`HierarchyError::AlreadyAttached`].
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), HierarchyError> {
        if self.get(parent).is_none() {
            return Err(HierarchyError::UnknownNode(parent));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(HierarchyError::CyclicAttachment { child, parent });
        }
        let child_node = self
            .nodes
            .get_mut(child.0)
            .ok_or(HierarchyError::UnknownNode(child))?;
        if let Some(existing) = child_node.parent {
            return Err(HierarchyError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        child_node.parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Walk from `id`'s parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(TreeNode::parent),
        }
    }

    /// Number of edges between `id` and the root.
    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Report every leaf-most node under `id` whose bounds contain the point.
    ///
    /// Returns `true` when `id` or one of its descendants covered the point.
    /// Matches are reported in depth-first order, so among siblings the
    /// earlier one is reported first.
    pub fn find_leaf_most_nodes_at_point<F>(
        &self,
        id: NodeId,
        px: i32,
        py: i32,
        on_found: &mut F,
    ) -> bool
    where
        F: FnMut(NodeId),
    {
        let Some(node) = self.get(id) else {
            return false;
        };

        let mut found_in_child = false;
        for &child in &node.children {
            found_in_child |= self.find_leaf_most_nodes_at_point(child, px, py, on_found);
        }
        if found_in_child {
            return true;
        }

        match node.bounds() {
            Some(rect) if rect.contains(px, py) => {
                on_found(id);
                true
            }
            _ => false,
        }
    }

    /// Collect the leaf-most matches for the whole tree.
    pub fn leaf_most_nodes_at_point(&self, px: i32, py: i32) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.find_leaf_most_nodes_at_point(self.root(), px, py, &mut |id| found.push(id));
        found
    }
}

impl std::ops::Index<NodeId> for HierarchyTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

/// Iterator returned by [`HierarchyTree::ancestors`].
pub struct Ancestors<'a> {
    tree: &'a HierarchyTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(TreeNode::parent);
        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::node::RootWindow;
    use super::*;

    fn element(bounds: &str) -> NodeKind {
        let mut e = UiElement::new();
        e.add_attribute("bounds", bounds);
        e.resolve_bounds().unwrap();
        NodeKind::UiElement(e)
    }

    fn root() -> NodeKind {
        NodeKind::RootWindow(RootWindow::new("w", 0))
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            Rect::parse_bounds("[0,48][1080,1920]").unwrap(),
            Rect::new(0, 48, 1080, 1872)
        );
    }

    #[test]
    fn test_parse_bounds_negative_origin() {
        let r = Rect::parse_bounds("[-20,-5][100,50]").unwrap();
        assert_eq!(r, Rect::new(-20, -5, 120, 55));
    }

    #[test]
    fn test_parse_bounds_reversed_corners_pass_through() {
        let r = Rect::parse_bounds("[10,10][5,20]").unwrap();
        assert_eq!(r.width, -5);
        assert_eq!(r.height, 10);
    }

    #[test]
    fn test_parse_bounds_rejects_other_formats() {
        for raw in ["10,10,100,100", "[1,2][3]", "[a,b][c,d]", " [0,0][1,1]", ""] {
            assert!(
                matches!(Rect::parse_bounds(raw), Err(HierarchyError::InvalidBounds(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_bounds_overflow_is_invalid() {
        assert!(Rect::parse_bounds("[0,0][99999999999,1]").is_err());
        assert!(Rect::parse_bounds("[-2147483648,0][2147483647,1]").is_err());
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = Rect::new(10, 10, 10, 10);
        assert!(r.contains(10, 10));
        assert!(r.contains(20, 20));
        assert!(!r.contains(21, 15));
        assert!(!r.contains(15, 9));
    }

    #[test]
    fn test_add_child_sets_parent_and_order() {
        let mut tree = HierarchyTree::new(root());
        let a = tree.push(element("[0,0][10,10]"));
        let b = tree.push(element("[10,0][20,10]"));
        tree.add_child(tree.root(), a).unwrap();
        tree.add_child(tree.root(), b).unwrap();
        assert_eq!(tree[tree.root()].children(), &[a, b]);
        assert_eq!(tree[a].parent(), Some(tree.root()));
        assert_eq!(tree.depth(b), 1);
    }

    #[test]
    fn test_add_child_twice_is_rejected() {
        let mut tree = HierarchyTree::new(root());
        let a = tree.push(element("[0,0][10,10]"));
        let b = tree.push(element("[0,0][5,5]"));
        tree.add_child(tree.root(), a).unwrap();
        assert_eq!(
            tree.add_child(tree.root(), a),
            Err(HierarchyError::AlreadyAttached {
                child: a,
                parent: tree.root()
            })
        );
        assert!(tree.add_child(b, a).is_err());
        assert_eq!(
            tree.add_child(b, b),
            Err(HierarchyError::CyclicAttachment { child: b, parent: b })
        );
        assert_eq!(
            tree.add_child(a, tree.root()),
            Err(HierarchyError::CyclicAttachment {
                child: tree.root(),
                parent: a
            })
        );
        assert_eq!(
            tree.add_child(b, NodeId(99)),
            Err(HierarchyError::UnknownNode(NodeId(99)))
        );
        assert_eq!(tree[tree.root()].child_count(), 1);
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let mut tree = HierarchyTree::new(root());
        let a = tree.push(element("[0,0][10,10]"));
        let b = tree.push(element("[0,0][5,5]"));
        tree.add_child(tree.root(), a).unwrap();
        tree.add_child(a, b).unwrap();
        let chain: Vec<_> = tree.ancestors(b).collect();
        assert_eq!(chain, vec![a, tree.root()]);
        assert_eq!(tree.ancestors(tree.root()).count(), 0);
    }

    #[test]
    fn test_hit_test_prefers_child() {
        let mut tree = HierarchyTree::new(root());
        let parent = tree.push(element("[0,0][100,100]"));
        let child = tree.push(element("[10,10][20,20]"));
        tree.add_child(tree.root(), parent).unwrap();
        tree.add_child(parent, child).unwrap();

        assert_eq!(tree.leaf_most_nodes_at_point(15, 15), vec![child]);
        assert_eq!(tree.leaf_most_nodes_at_point(50, 50), vec![parent]);
        assert!(tree.leaf_most_nodes_at_point(500, 500).is_empty());
    }

    #[test]
    fn test_hit_test_reports_touching_siblings() {
        let mut tree = HierarchyTree::new(root());
        let left = tree.push(element("[0,0][10,10]"));
        let right = tree.push(element("[10,0][20,10]"));
        tree.add_child(tree.root(), left).unwrap();
        tree.add_child(tree.root(), right).unwrap();
        assert_eq!(tree.leaf_most_nodes_at_point(10, 5), vec![left, right]);
    }

    #[test]
    fn test_hit_test_passes_through_unbounded_nodes() {
        let mut tree = HierarchyTree::new(root());
        let group = tree.push(NodeKind::UiElement(UiElement::new()));
        let leaf = tree.push(element("[0,0][10,10]"));
        tree.add_child(tree.root(), group).unwrap();
        tree.add_child(group, leaf).unwrap();
        assert!(!tree[group].has_bounds());
        assert_eq!(tree.leaf_most_nodes_at_point(5, 5), vec![leaf]);
    }

    #[test]
    fn test_attribute_pairs_cached() {
        let tree = HierarchyTree::new(element("[0,0][1,1]"));
        let first = tree[tree.root()].attribute_pairs().as_ptr();
        let second = tree[tree.root()].attribute_pairs().as_ptr();
        assert_eq!(first, second);
        assert_eq!(tree[tree.root()].attribute_pairs()[0].key, "bounds");
    }
}
