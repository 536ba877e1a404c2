//! Remote node address.
//!
//! # Responsibility
//! - Carry the opaque locator used to reach one node's remote resource.
//! - Own the positional contract between client array order and server
//!   identity.
//!
//! # Invariants
//! - A child at index `i` under a parent at `p` is addressed as `{p}/{i}`.
//! - Addresses are never normalized: `/outline/` + `0` is `/outline//0`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque locator of one outline node on the remote side.
///
/// Apart from [`Address::child`], callers must not assume any structure; the
/// server decides the initial spelling and the client only extends it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the address of the child at `index` under this address.
    ///
    /// This is the only place where the path-of-indices contract is spelled
    /// out. Renumbering after a delete relies on it.
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}/{index}", self.0))
    }

    /// Returns the non-empty `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}
