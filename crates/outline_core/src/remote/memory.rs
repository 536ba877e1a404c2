//! In-process outline remote.
//!
//! # Responsibility
//! - Serve the outline resource protocol from an in-memory tree.
//! - Record every request and allow one-shot failure injection so tree
//!   synchronization can be exercised without a network.
//!
//! # Invariants
//! - Addressing follows the reference server: root is `/outline/`, nodes are
//!   `/outline/{i}/{j}/.../`, created nodes are reported without the trailing
//!   slash.
//! - Empty path segments are ignored, so `/outline//1` and `/outline/1/`
//!   resolve to the same node.

use crate::model::address::Address;
use crate::remote::{
    CreatedRecord, NodeRecord, OutlineRemote, RemoteError, RemoteMethod, RemoteResult,
    RenameRecord,
};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

const ROOT_ADDRESS: &str = "/outline/";
const DEFAULT_NAME: &str = "outline";
const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_NOT_FOUND: u16 = 404;

static ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/outline(?:/(?P<path>[0-9/]*))?$").expect("route pattern is valid")
});

/// One request observed by `MemoryRemote`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub method: RemoteMethod,
    pub address: Address,
}

#[derive(Debug, Clone)]
struct StoredNode {
    name: String,
    items: Vec<StoredNode>,
}

impl StoredNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }
}

type LabelRewrite = Box<dyn Fn(&str) -> String + Send + Sync>;

struct MemoryState {
    root: StoredNode,
    calls: Vec<RemoteCall>,
    failures: HashMap<RemoteMethod, VecDeque<u16>>,
    rewrite: Option<LabelRewrite>,
}

/// Outline remote backed by an in-memory tree.
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    /// Creates a store holding only the root node.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                root: StoredNode::new(DEFAULT_NAME),
                calls: Vec::new(),
                failures: HashMap::new(),
                rewrite: None,
            }),
        }
    }

    /// Address of the root resource.
    pub fn root_address() -> Address {
        Address::from(ROOT_ADDRESS)
    }

    /// Appends a child named `name` under the node at `parent_path` without
    /// recording a call. Returns the new node's index path.
    pub fn seed(&self, parent_path: &[usize], name: &str) -> Option<Vec<usize>> {
        let mut state = self.lock();
        let parent = find_mut(&mut state.root, parent_path)?;
        parent.items.push(StoredNode::new(name));
        let mut path = parent_path.to_vec();
        path.push(parent.items.len() - 1);
        Some(path)
    }

    /// Seeds a full tree of the given depth and branching factor below the
    /// root. Labels spell out the index path, e.g. `n-0-2`.
    pub fn seed_uniform(&self, depth: usize, branching: usize) {
        let mut pending = vec![Vec::<usize>::new()];
        while let Some(path) = pending.pop() {
            if path.len() == depth {
                continue;
            }
            for index in 0..branching {
                let mut child_path = path.clone();
                child_path.push(index);
                let label = std::iter::once("n".to_string())
                    .chain(child_path.iter().map(ToString::to_string))
                    .collect::<Vec<_>>()
                    .join("-");
                if self.seed(&path, label.as_str()).is_some() {
                    pending.push(child_path);
                }
            }
        }
    }

    /// Label stored at `path`, if the node exists.
    pub fn label_at(&self, path: &[usize]) -> Option<String> {
        let mut state = self.lock();
        find_mut(&mut state.root, path).map(|node| node.name.clone())
    }

    /// Number of children stored at `path`, if the node exists.
    pub fn child_count(&self, path: &[usize]) -> Option<usize> {
        let mut state = self.lock();
        find_mut(&mut state.root, path).map(|node| node.items.len())
    }

    /// Makes the next call of `method` fail with `status`.
    pub fn fail_next(&self, method: RemoteMethod, status: u16) {
        self.lock()
            .failures
            .entry(method)
            .or_default()
            .push_back(status);
    }

    /// Rewrites every accepted label before it is stored.
    pub fn rewrite_labels_with<F>(&self, rewrite: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.lock().rewrite = Some(Box::new(rewrite));
    }

    /// All requests received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, method: RemoteMethod) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records the call, consumes an injected failure if any, and resolves
    /// the address into an index path.
    fn begin(
        state: &mut MemoryState,
        method: RemoteMethod,
        address: &Address,
    ) -> RemoteResult<Vec<usize>> {
        debug!("event=memory_request module=remote method={method} address={address}");
        state.calls.push(RemoteCall {
            method,
            address: address.clone(),
        });
        if let Some(status) = state
            .failures
            .get_mut(&method)
            .and_then(VecDeque::pop_front)
        {
            return Err(status_error(method, address, status));
        }
        parse_path(address).ok_or_else(|| status_error(method, address, STATUS_NOT_FOUND))
    }
}

#[async_trait]
impl OutlineRemote for MemoryRemote {
    async fn fetch(&self, address: &Address) -> RemoteResult<NodeRecord> {
        let mut state = self.lock();
        let path = Self::begin(&mut state, RemoteMethod::Get, address)?;
        let node = find_mut(&mut state.root, &path)
            .ok_or_else(|| status_error(RemoteMethod::Get, address, STATUS_NOT_FOUND))?;
        let base = canonical_prefix(&path);
        Ok(NodeRecord {
            url: Address::from(base.clone()),
            name: node.name.clone(),
            children: (0..node.items.len())
                .map(|index| Address::from(format!("{base}{index}/")))
                .collect(),
        })
    }

    async fn create(&self, parent: &Address) -> RemoteResult<CreatedRecord> {
        let mut state = self.lock();
        let path = Self::begin(&mut state, RemoteMethod::Post, parent)?;
        let node = find_mut(&mut state.root, &path)
            .ok_or_else(|| status_error(RemoteMethod::Post, parent, STATUS_NOT_FOUND))?;
        node.items.push(StoredNode::new(DEFAULT_NAME));
        let index = node.items.len() - 1;
        Ok(CreatedRecord {
            url: Address::from(format!("{}{index}", canonical_prefix(&path))),
            name: DEFAULT_NAME.to_string(),
        })
    }

    async fn rename(&self, address: &Address, name: &str) -> RemoteResult<RenameRecord> {
        let mut state = self.lock();
        let path = Self::begin(&mut state, RemoteMethod::Put, address)?;
        if find_mut(&mut state.root, &path).is_none() {
            return Err(status_error(RemoteMethod::Put, address, STATUS_NOT_FOUND));
        }
        if name.is_empty() {
            return Err(status_error(RemoteMethod::Put, address, STATUS_BAD_REQUEST));
        }
        let stored = match &state.rewrite {
            Some(rewrite) => rewrite(name),
            None => name.to_string(),
        };
        let node = find_mut(&mut state.root, &path)
            .ok_or_else(|| status_error(RemoteMethod::Put, address, STATUS_NOT_FOUND))?;
        node.name = stored;
        Ok(RenameRecord {
            name: node.name.clone(),
        })
    }

    async fn delete(&self, address: &Address) -> RemoteResult<()> {
        let mut state = self.lock();
        let path = Self::begin(&mut state, RemoteMethod::Delete, address)?;
        let Some((last, parent_path)) = path.split_last() else {
            return Err(status_error(
                RemoteMethod::Delete,
                address,
                STATUS_BAD_REQUEST,
            ));
        };
        let parent = find_mut(&mut state.root, parent_path)
            .filter(|parent| *last < parent.items.len())
            .ok_or_else(|| status_error(RemoteMethod::Delete, address, STATUS_NOT_FOUND))?;
        parent.items.remove(*last);
        Ok(())
    }
}

fn status_error(method: RemoteMethod, address: &Address, status: u16) -> RemoteError {
    RemoteError::Status {
        method,
        address: address.clone(),
        status,
    }
}

fn parse_path(address: &Address) -> Option<Vec<usize>> {
    let captures = ROUTE.captures(address.as_str())?;
    let Some(path) = captures.name("path") else {
        return Some(Vec::new());
    };
    path.as_str()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.parse::<usize>().ok())
        .collect()
}

fn canonical_prefix(path: &[usize]) -> String {
    let mut prefix = ROOT_ADDRESS.to_string();
    for index in path {
        prefix.push_str(&format!("{index}/"));
    }
    prefix
}

fn find_mut<'a>(root: &'a mut StoredNode, path: &[usize]) -> Option<&'a mut StoredNode> {
    let mut current = root;
    for index in path {
        current = current.items.get_mut(*index)?;
    }
    Some(current)
}
