//! Remote outline resource boundary.
//!
//! # Responsibility
//! - Define the wire records exchanged with the outline server.
//! - Define the `OutlineRemote` contract the tree service is written against.
//!
//! # Invariants
//! - Any non-2xx response maps to `RemoteError::Status`.
//! - The server, not the client, assigns addresses to created nodes.
//!
//! # See also
//! - `http` for the reqwest-backed implementation.
//! - `memory` for the in-process implementation used by tests and demos.

pub mod http;
pub mod memory;

use crate::model::address::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use http::HttpRemote;
pub use memory::{MemoryRemote, RemoteCall};

/// Result type used by remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// HTTP verb used against one node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl RemoteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl Display for RemoteMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from remote outline calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Server answered with a non-success status.
    Status {
        method: RemoteMethod,
        address: Address,
        status: u16,
    },
    /// Request never produced a response.
    Transport(String),
    /// Response body could not be decoded into the expected record.
    Decode(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status {
                method,
                address,
                status,
            } => write!(f, "{method} {address} returned status {status}"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
            Self::Decode(message) => write!(f, "invalid response body: {message}"),
        }
    }
}

impl Error for RemoteError {}

/// Record returned by `GET {address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub url: Address,
    pub name: String,
    /// Child addresses in display order.
    #[serde(default)]
    pub children: Vec<Address>,
}

/// Record returned by `POST {address}` for the newly created child.
///
/// The reference server also echoes an empty `children` list; it is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    pub url: Address,
    pub name: String,
}

/// Body sent with `PUT {address}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Record returned by `PUT {address}`; carries the authoritative label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub name: String,
}

/// Remote source of outline nodes.
#[async_trait]
pub trait OutlineRemote: Send + Sync {
    /// Reads one node and its child addresses.
    async fn fetch(&self, address: &Address) -> RemoteResult<NodeRecord>;
    /// Creates one child under `parent`; the server assigns its address.
    async fn create(&self, parent: &Address) -> RemoteResult<CreatedRecord>;
    /// Sets the label of one node and returns the stored value.
    async fn rename(&self, address: &Address, name: &str) -> RemoteResult<RenameRecord>;
    /// Removes one node.
    async fn delete(&self, address: &Address) -> RemoteResult<()>;
}

#[async_trait]
impl<T: OutlineRemote + ?Sized> OutlineRemote for std::sync::Arc<T> {
    async fn fetch(&self, address: &Address) -> RemoteResult<NodeRecord> {
        (**self).fetch(address).await
    }

    async fn create(&self, parent: &Address) -> RemoteResult<CreatedRecord> {
        (**self).create(parent).await
    }

    async fn rename(&self, address: &Address, name: &str) -> RemoteResult<RenameRecord> {
        (**self).rename(address, name).await
    }

    async fn delete(&self, address: &Address) -> RemoteResult<()> {
        (**self).delete(address).await
    }
}

#[cfg(test)]
mod tests {
    use super::{CreatedRecord, NodeRecord, RemoteError, RemoteMethod};
    use crate::model::address::Address;

    #[test]
    fn node_record_parses_server_payload() {
        let record: NodeRecord = serde_json::from_str(
            r#"{"url":"/outline/","name":"outline","children":["/outline/0/","/outline/1/"]}"#,
        )
        .unwrap();
        assert_eq!(record.url, Address::from("/outline/"));
        assert_eq!(record.children.len(), 2);
        assert_eq!(record.children[1].as_str(), "/outline/1/");
    }

    #[test]
    fn created_record_ignores_extra_fields() {
        let record: CreatedRecord =
            serde_json::from_str(r#"{"url":"/outline/4","name":"outline","children":[]}"#)
                .unwrap();
        assert_eq!(record.url.as_str(), "/outline/4");
        assert_eq!(record.name, "outline");
    }

    #[test]
    fn status_error_names_method_and_address() {
        let err = RemoteError::Status {
            method: RemoteMethod::Delete,
            address: Address::from("/outline/2/"),
            status: 404,
        };
        assert_eq!(err.to_string(), "DELETE /outline/2/ returned status 404");
    }
}
