//! Error types for `hview_core`.
//!
//! All core failures are funnelled through [`HierarchyError`], which uses
//! `thiserror` for `Display` and `Error` derives.  Parsing is all-or-nothing:
//! any error aborts the whole dump and no partial tree is returned.

use thiserror::Error;

use crate::tree::NodeId;

/// Top-level error type for the `hview_core` library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// The dump is not well-formed XML.
    #[error("MalformedDocument: {0}")]
    MalformedDocument(String),

    /// A `bounds` attribute does not match `[x0,y0][x1,y1]`.
    #[error("InvalidBounds: {0}")]
    InvalidBounds(String),

    /// The dump contains no element at all.
    #[error("EmptyDocument: no root element found")]
    EmptyDocument,

    /// The node already has a parent.
    #[error("AlreadyAttached: node {child} is already a child of node {parent}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    /// Attaching would make a node its own ancestor.
    #[error("CyclicAttachment: node {child} is an ancestor of node {parent}")]
    CyclicAttachment { child: NodeId, parent: NodeId },

    /// The id does not belong to this tree.
    #[error("UnknownNode: node {0} does not exist")]
    UnknownNode(NodeId),
}

impl From<quick_xml::Error> for HierarchyError {
    fn from(err: quick_xml::Error) -> Self {
        HierarchyError::MalformedDocument(err.to_string())
    }
}
