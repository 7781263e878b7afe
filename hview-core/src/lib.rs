//! `hview_core` -- UI hierarchy dump model.
//!
//! This crate parses a device UI hierarchy dump (XML) into a tree, answers
//! "which node is at (x, y)" and searches nodes by text.  It performs no
//! I/O and no rendering; callers hand in the dump bytes and consume ids,
//! rectangles and snapshots.  It can be consumed by:
//! - `hview-cli` (standalone CLI tools and the IPC worker)
//! - any presentation layer embedding the model directly
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `HierarchyError` enum via `thiserror` |
//! | [`tree`] | Node arena, bounds, hit-testing, serializable snapshots |
//! | [`parser`] | Dump parsing via `quick-xml` |
//! | [`model`] | Selection, explore / NAF flags, `node_at`, `search` |
//! | [`search`] | Search result navigation state machine |
//! | [`shared`] | Swap-the-model handle via `parking_lot` |

pub mod errors;
pub mod model;
pub mod parser;
pub mod search;
pub mod shared;
pub mod tree;

pub use errors::HierarchyError;
pub use model::HierarchyModel;
pub use parser::{HierarchyParser, ParsedHierarchy};
pub use tree::{HierarchyTree, NodeId, Rect, TreeNode};
