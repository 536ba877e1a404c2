//! Outline domain model.
//!
//! # Responsibility
//! - Define the node record and the address contract shared by the tree
//!   service and the remote boundary.
//!
//! # Invariants
//! - A node's address encodes its position among its parent's children.
//! - The tree is acyclic: no node is its own ancestor.

pub mod address;
pub mod node;
