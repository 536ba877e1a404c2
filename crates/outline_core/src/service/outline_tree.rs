//! Outline tree synchronization service.
//!
//! # Responsibility
//! - Hydrate a node and all its descendants from an `OutlineRemote`.
//! - Run create/rename/delete against the remote and keep the in-memory tree
//!   consistent with the server afterwards.
//!
//! # Invariants
//! - Child order is display order; created children are appended.
//! - After a delete, every later sibling and all of its descendants carry
//!   addresses that match their new index (see `Address::child`).
//! - The server is the source of truth for created addresses and labels.
//! - Detached nodes are gone from the arena; their ids are never reused.
//! - Mutations take `&mut self`, so operations on one tree never interleave.

use crate::model::address::Address;
use crate::model::node::{Node, NodeId};
use crate::remote::{OutlineRemote, RemoteError};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by outline tree operations.
pub type OutlineResult<T> = Result<T, OutlineError>;

/// Errors from outline tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutlineError {
    /// Reading a node during hydration failed.
    Fetch {
        address: Address,
        source: RemoteError,
    },
    /// Creating a child failed.
    Create {
        address: Address,
        source: RemoteError,
    },
    /// Renaming a node failed.
    Rename {
        address: Address,
        source: RemoteError,
    },
    /// Deleting a node failed.
    Delete {
        address: Address,
        source: RemoteError,
    },
    /// Handle does not point at a live node of this tree.
    NodeNotFound(NodeId),
}

impl Display for OutlineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch { address, source } => {
                write!(f, "failed to fetch outline at {address}: {source}")
            }
            Self::Create { address, source } => {
                write!(f, "failed to add item under {address}: {source}")
            }
            Self::Rename { address, source } => {
                write!(f, "failed to edit name of {address}: {source}")
            }
            Self::Delete { address, source } => {
                write!(f, "failed to delete item {address}: {source}")
            }
            Self::NodeNotFound(id) => write!(f, "outline node not found: {id}"),
        }
    }
}

impl Error for OutlineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch { source, .. }
            | Self::Create { source, .. }
            | Self::Rename { source, .. }
            | Self::Delete { source, .. } => Some(source),
            Self::NodeNotFound(_) => None,
        }
    }
}

/// What `delete` did locally after the server accepted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Node and its subtree were detached; later siblings were renumbered.
    Detached {
        parent: NodeId,
        index: usize,
        /// Number of later siblings whose subtrees were readdressed.
        renumbered: usize,
    },
    /// Node has no parent (the root); nothing changes locally.
    RootUnchanged,
    /// Parent no longer lists the node; nothing changes locally.
    NotListed,
}

/// In-memory outline tree kept in sync with a remote source.
///
/// Nodes live in an arena indexed by `NodeId`; `parent` links are plain
/// handles and never own anything.
pub struct OutlineTree<R: OutlineRemote> {
    remote: R,
    slots: Vec<Option<Node>>,
    root: NodeId,
    live: usize,
}

impl<R: OutlineRemote> OutlineTree<R> {
    /// Loads the node at `address` and every descendant.
    ///
    /// Children are fetched one at a time in display order; a child's whole
    /// subtree is loaded before its next sibling is requested.
    pub async fn hydrate(remote: R, address: impl Into<Address>) -> OutlineResult<Self> {
        let address = address.into();
        let mut tree = Self {
            remote,
            slots: Vec::new(),
            // First fetched record always lands in slot 0.
            root: NodeId(0),
            live: 0,
        };

        let mut pending: Vec<(Address, Option<NodeId>)> = vec![(address.clone(), None)];
        while let Some((next, parent)) = pending.pop() {
            let record = tree
                .remote
                .fetch(&next)
                .await
                .map_err(|source| OutlineError::Fetch {
                    address: next.clone(),
                    source,
                })?;

            let id = tree.insert(Node::new(record.url, record.name, parent));
            if let Some(parent) = parent {
                tree.node_mut(parent)?.children.push(id);
            }
            // Reverse push keeps pops in display order.
            pending.extend(record.children.into_iter().rev().map(|child| (child, Some(id))));
        }

        info!(
            "event=outline_hydrate module=outline_tree status=ok address={} nodes={}",
            address, tree.live
        );
        Ok(tree)
    }

    /// Asks the server for a new child of `parent` and appends it.
    ///
    /// The new node is always last and keeps the address the server gave it.
    pub async fn create_child(&mut self, parent: NodeId) -> OutlineResult<NodeId> {
        let parent_address = self.node(parent)?.address.clone();
        let record = self
            .remote
            .create(&parent_address)
            .await
            .map_err(|source| {
                warn!(
                    "event=outline_create module=outline_tree status=error address={parent_address}"
                );
                OutlineError::Create {
                    address: parent_address.clone(),
                    source,
                }
            })?;

        let id = self.insert(Node::new(record.url, record.name, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        info!(
            "event=outline_create module=outline_tree status=ok parent={} address={}",
            parent_address,
            self.node(id)?.address
        );
        Ok(id)
    }

    /// Sets the label of `node` to `label`.
    ///
    /// `label` is trimmed first. Returns `Ok(false)` without contacting the
    /// server when it is blank or equal to the current label. On success the
    /// label returned by the server is stored, not the one supplied.
    pub async fn rename(&mut self, node: NodeId, label: &str) -> OutlineResult<bool> {
        let label = label.trim();
        let current = self.node(node)?;
        if label.is_empty() || label == current.label {
            debug!(
                "event=outline_rename module=outline_tree status=skipped address={}",
                current.address
            );
            return Ok(false);
        }

        let address = current.address.clone();
        let record = self
            .remote
            .rename(&address, label)
            .await
            .map_err(|source| {
                warn!("event=outline_rename module=outline_tree status=error address={address}");
                OutlineError::Rename {
                    address: address.clone(),
                    source,
                }
            })?;

        self.node_mut(node)?.label = record.name;
        info!("event=outline_rename module=outline_tree status=ok address={address}");
        Ok(true)
    }

    /// Deletes `node` on the server, then detaches it and renumbers the
    /// siblings that followed it.
    ///
    /// Deleting the root is a documented no-op locally: the request is still
    /// sent, and the tree is left untouched when it succeeds.
    pub async fn delete(&mut self, node: NodeId) -> OutlineResult<DeleteOutcome> {
        let address = self.node(node)?.address.clone();
        self.remote.delete(&address).await.map_err(|source| {
            warn!("event=outline_delete module=outline_tree status=error address={address}");
            OutlineError::Delete {
                address: address.clone(),
                source,
            }
        })?;

        let Some(parent) = self.node(node)?.parent else {
            info!("event=outline_delete module=outline_tree status=ok address={address} root=true");
            return Ok(DeleteOutcome::RootUnchanged);
        };

        let Some(index) = self
            .node(parent)?
            .children
            .iter()
            .position(|child| *child == node)
        else {
            warn!(
                "event=outline_delete module=outline_tree status=ok address={address} listed=false"
            );
            return Ok(DeleteOutcome::NotListed);
        };

        self.node_mut(parent)?.children.remove(index);
        let renumbered = self.renumber(parent, index)?;
        let detached = self.detach(node);
        info!(
            "event=outline_delete module=outline_tree status=ok address={} index={} renumbered={} detached={}",
            address, index, renumbered, detached
        );
        Ok(DeleteOutcome::Detached {
            parent,
            index,
            renumbered,
        })
    }

    /// Readdresses children of `parent` from `start` to the end, and all of
    /// their descendants, so each address matches its current index.
    ///
    /// Siblings are processed in ascending index order; each sibling's
    /// subtree is rewritten depth-first before moving on. Returns the number
    /// of siblings rewritten, which is zero when `start` is past the end.
    pub fn renumber(&mut self, parent: NodeId, start: usize) -> OutlineResult<usize> {
        let parent_address = self.node(parent)?.address.clone();
        let siblings: Vec<NodeId> = self
            .node(parent)?
            .children
            .iter()
            .skip(start)
            .copied()
            .collect();

        for (offset, sibling) in siblings.iter().enumerate() {
            let mut pending = vec![(*sibling, parent_address.child(start + offset))];
            while let Some((id, address)) = pending.pop() {
                let node = self.node_mut(id)?;
                node.address = address;
                let children: Vec<(NodeId, Address)> = node
                    .children
                    .iter()
                    .enumerate()
                    .map(|(index, child)| (*child, node.address.child(index)))
                    .collect();
                pending.extend(children.into_iter().rev());
            }
        }

        if !siblings.is_empty() {
            debug!(
                "event=outline_renumber module=outline_tree status=ok parent={} start={} siblings={}",
                parent_address,
                start,
                siblings.len()
            );
        }
        Ok(siblings.len())
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Resolves a live node.
    pub fn node(&self, id: NodeId) -> OutlineResult<&Node> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(OutlineError::NodeNotFound(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Child at `index` under `parent`, if any.
    pub fn child(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.get(parent)?.children.get(index).copied()
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// First live node, in pre-order, whose address equals `address`.
    pub fn find_by_address(&self, address: &Address) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| self.get(*id).is_some_and(|node| node.address == *address))
    }

    /// Live nodes in display (pre-)order paired with their depth; root is
    /// depth 0.
    pub fn walk(&self) -> Vec<(NodeId, usize)> {
        let mut visited = Vec::with_capacity(self.live);
        let mut pending = vec![(self.root, 0usize)];
        while let Some((id, depth)) = pending.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            visited.push((id, depth));
            pending.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
        }
        visited
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Some(node));
        self.live += 1;
        id
    }

    fn node_mut(&mut self, id: NodeId) -> OutlineResult<&mut Node> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(OutlineError::NodeNotFound(id))
    }

    /// Frees `id` and its whole subtree. Returns the number of freed nodes.
    fn detach(&mut self, id: NodeId) -> usize {
        let mut freed = 0;
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.slots.get_mut(current.0).and_then(Option::take) {
                pending.extend(node.children);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::{OutlineError, OutlineTree};
    use crate::model::address::Address;
    use crate::remote::{MemoryRemote, RemoteMethod};

    async fn two_level_tree() -> OutlineTree<MemoryRemote> {
        let remote = MemoryRemote::new();
        remote.seed(&[], "a").unwrap();
        remote.seed(&[], "b").unwrap();
        remote.seed(&[1], "b.a").unwrap();
        OutlineTree::hydrate(remote, MemoryRemote::root_address())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn renumber_past_end_touches_nothing() {
        let mut tree = two_level_tree().await;
        let root = tree.root();
        assert_eq!(tree.renumber(root, 2).unwrap(), 0);
        assert_eq!(tree.renumber(root, 10).unwrap(), 0);
        let b = tree.child(root, 1).unwrap();
        assert_eq!(tree.node(b).unwrap().address().as_str(), "/outline/1/");
    }

    #[tokio::test]
    async fn renumber_rewrites_suffix_and_descendants() {
        let mut tree = two_level_tree().await;
        let root = tree.root();
        assert_eq!(tree.renumber(root, 1).unwrap(), 1);

        let b = tree.child(root, 1).unwrap();
        let b_a = tree.child(b, 0).unwrap();
        assert_eq!(tree.node(b).unwrap().address().as_str(), "/outline//1");
        assert_eq!(tree.node(b_a).unwrap().address().as_str(), "/outline//1/0");

        let a = tree.child(root, 0).unwrap();
        assert_eq!(tree.node(a).unwrap().address().as_str(), "/outline/0/");
    }

    #[tokio::test]
    async fn stale_handle_is_reported() {
        let mut tree = two_level_tree().await;
        let root = tree.root();
        let b = tree.child(root, 1).unwrap();
        let b_a = tree.child(b, 0).unwrap();

        tree.delete(b).await.unwrap();
        assert!(!tree.contains(b_a));
        assert_eq!(tree.len(), 2);

        let err = tree.rename(b_a, "ghost").await.unwrap_err();
        assert_eq!(err, OutlineError::NodeNotFound(b_a));
        assert_eq!(tree.remote().call_count(RemoteMethod::Put), 0);
    }

    #[tokio::test]
    async fn rejected_root_delete_is_reported() {
        let mut tree = two_level_tree().await;
        let root = tree.root();
        let err = tree.delete(root).await.unwrap_err();
        assert!(matches!(err, OutlineError::Delete { .. }));
        assert!(tree.contains(root));
        assert_eq!(tree.len(), 4);
    }

    #[tokio::test]
    async fn find_by_address_and_walk_follow_display_order() {
        let tree = two_level_tree().await;
        let labels: Vec<(String, usize)> = tree
            .walk()
            .into_iter()
            .map(|(id, depth)| (tree.node(id).unwrap().label().to_string(), depth))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("outline".to_string(), 0),
                ("a".to_string(), 1),
                ("b".to_string(), 1),
                ("b.a".to_string(), 2),
            ]
        );

        let found = tree
            .find_by_address(&Address::from("/outline/1/0/"))
            .unwrap();
        assert_eq!(tree.node(found).unwrap().label(), "b.a");
        assert!(tree.find_by_address(&Address::from("/outline/9/")).is_none());
    }
}
