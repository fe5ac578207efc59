//! Configuration management
//!
//! This module holds the process-wide settings consumed by the remote
//! command channel: listener host and port, the owning authorization id,
//! the client send timeout, the transport security mode and the bots the
//! built-in registry exposes.

mod toml_parser;
mod validation;

pub use toml_parser::TomlConfig;
pub use validation::{validate_host, validate_port, validate_send_timeout};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default listener host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listener port
pub const DEFAULT_PORT: u16 = 1242;

/// Default client send timeout (five minutes)
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 300;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote channel settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Names of the enabled bots
    #[serde(default)]
    pub bots: Vec<String>,
}

/// Settings for the remote command channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Host to bind or connect to; `None` asks the operator
    #[serde(default = "default_host")]
    pub host: Option<String>,

    /// TCP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Owning authorization id; 0 refuses all commands
    #[serde(default)]
    pub owner_id: u64,

    /// Client send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Transport security mode
    #[serde(default)]
    pub security: SecurityMode,
}

/// Transport security applied to the channel
///
/// Neither mode encrypts or authenticates traffic. `None` keeps the channel
/// reachable from any host the listener is bound to, `LoopbackOnly` refuses to
/// bind or connect anywhere but a loopback address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No transport security
    #[default]
    None,
    /// Only loopback addresses are accepted
    LoopbackOnly,
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let toml_config = TomlConfig::from_file(path)?;
        Ok(toml_config.into())
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.remote.validate()
    }
}

impl RemoteConfig {
    /// The send timeout as a `Duration`
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Validate remote settings
    pub fn validate(&self) -> Result<()> {
        if let Some(host) = &self.host {
            validate_host(host)?;
        }
        validate_send_timeout(self.send_timeout_secs)?;
        Ok(())
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            owner_id: 0,
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
            security: SecurityMode::None,
        }
    }
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::LoopbackOnly => write!(f, "loopback_only"),
        }
    }
}

// Default value functions for serde
fn default_host() -> Option<String> {
    Some(DEFAULT_HOST.to_string())
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_send_timeout() -> u64 {
    DEFAULT_SEND_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.remote.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.remote.port, 1242);
        assert_eq!(config.remote.owner_id, 0);
        assert_eq!(config.remote.send_timeout(), Duration::from_secs(300));
        assert_eq!(config.remote.security, SecurityMode::None);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::new();
        config.remote.send_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        let mut config = Config::new();
        config.remote.host = Some("bad host".to_string());
        assert!(config.validate().is_err());
    }
}
