//! Outline node model.
//!
//! # Responsibility
//! - Define one outline entry and the handle used to reach it.
//!
//! # Invariants
//! - `children` order is display order.
//! - `parent` is a non-owning back-reference; it is `None` only for the root.
//! - `NodeId`s are never reused after a node is detached.

use crate::model::address::Address;
use std::fmt::{Display, Formatter};

/// Handle to one node inside an `OutlineTree` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the raw arena slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One outline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(crate) address: Address,
    pub(crate) label: String,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(address: Address, label: String, parent: Option<NodeId>) -> Self {
        Self {
            address,
            label,
            children: Vec::new(),
            parent,
        }
    }

    /// Remote locator; rewritten by renumbering after sibling deletes.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Display text as last confirmed by the server.
    pub fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Child handles in display order.
    pub fn children(&self) -> &[NodeId] {
        self.children.as_slice()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
