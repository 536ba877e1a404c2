//! Client-side synchronization for remote outline trees.
//! This crate owns the address invariants; callers only render and trigger.

pub mod config;
pub mod logging;
pub mod model;
pub mod remote;
pub mod render;
pub mod service;

pub use config::{ClientConfig, ConfigError};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogTarget, LoggingError,
};
pub use model::address::Address;
pub use model::node::{Node, NodeId};
pub use remote::{
    CreatedRecord, HttpRemote, MemoryRemote, NodeRecord, OutlineRemote, RemoteCall, RemoteError,
    RemoteMethod, RemoteResult, RenameRecord, RenameRequest,
};
pub use render::render_outline;
pub use service::outline_tree::{DeleteOutcome, OutlineError, OutlineResult, OutlineTree};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
