//! Selection and query facade over one parsed dump.
//!
//! A [`HierarchyModel`] is built once per dump and never changes shape.
//! Only the selection and the explore / NAF flags mutate over its lifetime;
//! loading another dump means building a new model.

use serde::Serialize;

use crate::errors::HierarchyError;
use crate::parser::{HierarchyParser, ParsedHierarchy};
use crate::tree::node::NodeKind;
use crate::tree::{HierarchyTree, NodeId, Rect, TreeNode};

/// Attribute keys consulted by [`HierarchyModel::search`].
pub const SEARCH_KEYS: &[&str] = &["text", "content-desc"];

#[derive(Debug)]
pub struct HierarchyModel {
    tree: HierarchyTree,
    all_nodes: Vec<NodeId>,
    naf_rects: Vec<Rect>,
    selected: Option<NodeId>,
    drawing_rect: Option<Rect>,
    explore_mode: bool,
    show_naf: bool,
}

/// Point-in-time view of the mutable model state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelState {
    pub selected: Option<NodeId>,
    pub drawing_rect: Option<Rect>,
    pub explore_mode: bool,
    pub show_naf: bool,
}

impl HierarchyModel {
    /// Wrap an already parsed dump.  Explore mode starts on, NAF display off.
    pub fn new(parsed: ParsedHierarchy) -> Self {
        Self {
            tree: parsed.tree,
            all_nodes: parsed.all_nodes,
            naf_rects: parsed.naf_rects,
            selected: None,
            drawing_rect: None,
            explore_mode: true,
            show_naf: false,
        }
    }

    /// Parse `xml` and build a model from it.
    pub fn from_xml(xml: &[u8]) -> Result<Self, HierarchyError> {
        let parsed = HierarchyParser::new().parse(xml)?;
        Ok(Self::new(parsed))
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.tree.get(id)
    }

    /// Every node in document order.
    pub fn all_nodes(&self) -> &[NodeId] {
        &self.all_nodes
    }

    pub fn naf_rects(&self) -> &[Rect] {
        &self.naf_rects
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected
    }

    /// Rectangle to highlight for the current selection.
    pub fn current_drawing_rect(&self) -> Option<Rect> {
        self.drawing_rect
    }

    /// Select `id`.  The highlight follows the node's bounds when it is an
    /// element with bounds and is cleared otherwise.
    pub fn select_node(&mut self, id: NodeId) {
        self.selected = Some(id);
        self.drawing_rect = match self.tree.get(id).map(TreeNode::kind) {
            Some(NodeKind::UiElement(element)) => element.bounds(),
            _ => None,
        };
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.drawing_rect = None;
    }

    /// Find the node under `(x, y)`.
    ///
    /// Among the leaf-most matches the smallest area wins; on equal areas
    /// the first in document order wins.  Returns `None` when nothing covers
    /// the point or when the winner is already selected.
    pub fn node_at(&self, x: i32, y: i32) -> Option<NodeId> {
        let mut best = MinAreaMatch::default();
        let found = self.tree.find_leaf_most_nodes_at_point(
            self.tree.root(),
            x,
            y,
            &mut |id| best.offer(id, &self.tree),
        );
        if !found {
            return None;
        }
        best.node.filter(|&id| Some(id) != self.selected)
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    /// Whether pointer movement drives node lookup.
    pub fn is_explore_mode(&self) -> bool {
        self.explore_mode
    }

    pub fn toggle_explore_mode(&mut self) {
        self.explore_mode = !self.explore_mode;
    }

    pub fn set_explore_mode(&mut self, explore_mode: bool) {
        self.explore_mode = explore_mode;
    }

    pub fn should_show_naf_nodes(&self) -> bool {
        self.show_naf
    }

    pub fn toggle_show_naf(&mut self) {
        self.show_naf = !self.show_naf;
    }

    pub fn state(&self) -> ModelState {
        ModelState {
            selected: self.selected,
            drawing_rect: self.drawing_rect,
            explore_mode: self.explore_mode,
            show_naf: self.show_naf,
        }
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    /// Case-insensitive substring search over the `text` and
    /// `content-desc` attributes, in document order.  Each node appears at
    /// most once.  An empty term matches every node that has one of the keys.
    pub fn search(&self, term: &str) -> Vec<NodeId> {
        let needle = term.to_lowercase();
        self.all_nodes
            .iter()
            .copied()
            .filter(|&id| {
                self.tree.get(id).is_some_and(|node| {
                    node.attribute_pairs().iter().any(|pair| {
                        SEARCH_KEYS.contains(&pair.key.as_str())
                            && pair.value.to_lowercase().contains(&needle)
                    })
                })
            })
            .collect()
    }
}

/// Keeps the first node with the strictly smallest area.
#[derive(Default)]
struct MinAreaMatch {
    node: Option<NodeId>,
    area: i64,
}

impl MinAreaMatch {
    fn offer(&mut self, id: NodeId, tree: &HierarchyTree) {
        let area = tree.get(id).and_then(TreeNode::bounds).map_or(0, |r| r.area());
        if self.node.is_none() || area < self.area {
            self.node = Some(id);
            self.area = area;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
