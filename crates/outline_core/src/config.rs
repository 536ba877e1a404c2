//! Client configuration.
//!
//! # Responsibility
//! - Resolve where the outline server lives and how the client logs.
//! - Apply defaults, then environment overrides, then validate.
//!
//! # Invariants
//! - `base_url` is an absolute `http(s)` URL without trailing slash.
//! - `root_address` is never blank.
//! - `timeout_ms` is strictly positive.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_ROOT_ADDRESS: &str = "/outline/";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_BASE_URL: &str = "OUTLINE_BASE_URL";
pub const ENV_ROOT_ADDRESS: &str = "OUTLINE_ROOT";
pub const ENV_TIMEOUT_MS: &str = "OUTLINE_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "OUTLINE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "OUTLINE_LOG_DIR";

/// Errors from configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL is blank or not `http(s)`.
    InvalidBaseUrl(String),
    /// Root address is blank.
    EmptyRootAddress,
    /// Timeout is zero or not a number.
    InvalidTimeout(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBaseUrl(value) => {
                write!(f, "base url must start with http:// or https://, got `{value}`")
            }
            Self::EmptyRootAddress => write!(f, "root address must not be blank"),
            Self::InvalidTimeout(value) => {
                write!(f, "timeout must be a positive number of milliseconds, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin that node addresses are appended to.
    pub base_url: String,
    /// Address of the outline root.
    pub root_address: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files. `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            root_address: DEFAULT_ROOT_ADDRESS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `OUTLINE_*` process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values from `lookup`.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = read(ENV_BASE_URL) {
            config.base_url = value;
        }
        if let Some(value) = read(ENV_ROOT_ADDRESS) {
            config.root_address = value;
        }
        if let Some(value) = read(ENV_TIMEOUT_MS) {
            config.timeout_ms = value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(value.clone()))?;
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = value;
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(value));
        }
        config.validate()
    }

    /// Normalizes and checks the configuration.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://"))
            || base_url.ends_with(':')
            || base_url.ends_with("//")
        {
            return Err(ConfigError::InvalidBaseUrl(self.base_url));
        }
        self.base_url = base_url;

        let root = self.root_address.trim();
        if root.is_empty() {
            return Err(ConfigError::EmptyRootAddress);
        }
        self.root_address = root.to_string();

        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout("0".to_string()));
        }
        Ok(self)
    }
}
