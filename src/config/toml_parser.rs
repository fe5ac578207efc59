//! TOML configuration file parser
//!
//! This module handles parsing of the TOML configuration file read at
//! startup. Bots can be listed with an `enabled` flag; only enabled bots
//! reach the runtime configuration.

use crate::config::{Config, RemoteConfig, SecurityMode};
use crate::error::{RemoteError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Remote channel table
    #[serde(default)]
    pub remote: TomlRemoteConfig,

    /// Bot entries
    #[serde(default)]
    pub bots: Vec<TomlBotConfig>,
}

/// TOML `[remote]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlRemoteConfig {
    /// Host; an empty string asks the operator at startup
    #[serde(default = "default_host")]
    pub host: Option<String>,

    /// Port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Owning authorization id
    #[serde(default)]
    pub owner_id: u64,

    /// Client send timeout in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    /// Security mode
    #[serde(default)]
    pub security: SecurityMode,
}

/// TOML `[[bots]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlBotConfig {
    /// Bot name
    pub name: String,

    /// Whether the bot accepts commands
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl TomlConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            RemoteError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(toml: &str) -> Result<Self> {
        toml::from_str(toml)
            .map_err(|e| RemoteError::Config(format!("Failed to parse TOML config: {}", e)))
    }
}

impl Default for TomlRemoteConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            owner_id: 0,
            send_timeout_secs: default_send_timeout(),
            security: SecurityMode::None,
        }
    }
}

impl From<TomlConfig> for Config {
    fn from(toml: TomlConfig) -> Self {
        Config {
            remote: toml.remote.into(),
            bots: toml
                .bots
                .into_iter()
                .filter(|b| b.enabled)
                .map(|b| b.name)
                .collect(),
        }
    }
}

impl From<TomlRemoteConfig> for RemoteConfig {
    fn from(toml: TomlRemoteConfig) -> Self {
        RemoteConfig {
            host: toml.host.filter(|h| !h.trim().is_empty()),
            port: toml.port,
            owner_id: toml.owner_id,
            send_timeout_secs: toml.send_timeout_secs,
            security: toml.security,
        }
    }
}

fn default_host() -> Option<String> {
    Some(crate::config::DEFAULT_HOST.to_string())
}

fn default_port() -> u16 {
    crate::config::DEFAULT_PORT
}

fn default_send_timeout() -> u64 {
    crate::config::DEFAULT_SEND_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}
