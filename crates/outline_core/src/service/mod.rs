//! Outline use-case services.
//!
//! # Responsibility
//! - Orchestrate remote calls into tree-level operations.
//! - Keep callers (CLI, embedders) decoupled from transport details.

pub mod outline_tree;
