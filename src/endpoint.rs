//! Endpoint resolution
//!
//! Builds the address the service binds and the client connects to from
//! [`RemoteConfig`]. When no host is configured the operator is asked for one
//! through a [`HostPrompt`]; an empty answer leaves the configuration
//! incomplete and the caller does nothing.

use crate::config::{RemoteConfig, SecurityMode};
use crate::error::{RemoteError, Result};
use std::io::{BufRead, Write};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::lookup_host;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Transport scheme of every endpoint
pub const SCHEME: &str = "tcp";

/// Fixed service path segment
pub const SERVICE_PATH: &str = "ASF";

/// A resolved service address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Transport identifier
    pub scheme: &'static str,
    /// Host name or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Service path segment
    pub path: String,
}

impl Endpoint {
    /// Create an endpoint for the fixed service path
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: SCHEME,
            host: host.into(),
            port,
            path: SERVICE_PATH.to_string(),
        }
    }

    /// Resolve the host and port to socket addresses
    pub async fn socket_addrs(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to resolve {}: {}", self, e)))?
            .collect();

        if addrs.is_empty() {
            return Err(RemoteError::Transport(format!(
                "No addresses found for {}",
                self
            )));
        }

        Ok(addrs)
    }

    /// Whether the host names the local machine
    pub fn is_loopback(&self) -> bool {
        if self.host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        self.host
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    /// Check the endpoint against the configured security mode
    ///
    /// `LoopbackOnly` rejects any non-loopback host. `None` accepts every host
    /// but warns when traffic may leave the machine unprotected.
    pub fn check_security(&self, mode: SecurityMode) -> Result<()> {
        match mode {
            SecurityMode::LoopbackOnly if !self.is_loopback() => Err(RemoteError::Security(
                format!("{} is not a loopback address and security mode is {}", self, mode),
            )),
            SecurityMode::LoopbackOnly => Ok(()),
            SecurityMode::None => {
                if !self.is_loopback() {
                    warn!(
                        "Remote channel on {} has no transport security: commands travel unencrypted and unauthenticated",
                        self
                    );
                }
                Ok(())
            }
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let host = match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => format!("[{}]", self.host),
            _ => self.host.clone(),
        };
        write!(f, "{}://{}:{}/{}", self.scheme, host, self.port, self.path)
    }
}

/// Operator input for a missing host
pub trait HostPrompt: Send + Sync {
    /// Ask for a host; `None` or an empty string means the operator declined
    fn prompt_host(&self) -> Option<String>;
}

/// Prompt that reads the host from standard input
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl HostPrompt for StdinPrompt {
    fn prompt_host(&self) -> Option<String> {
        print!("<remote> Please enter the hostname for the remote console: ");
        std::io::stdout().flush().ok()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        Some(line.trim().to_string())
    }
}

/// Prompt that always declines, for non-interactive use
#[derive(Debug, Default)]
pub struct NoPrompt;

impl HostPrompt for NoPrompt {
    fn prompt_host(&self) -> Option<String> {
        None
    }
}

#[derive(Debug)]
struct ResolverState {
    config: RemoteConfig,
    cached: Option<Endpoint>,
}

/// Resolves and caches the endpoint from configuration
///
/// Clones share the settings and the cached endpoint, so a host entered at
/// the prompt is asked for once and seen by every holder.
#[derive(Clone)]
pub struct EndpointResolver {
    state: Arc<Mutex<ResolverState>>,
    prompt: Arc<dyn HostPrompt>,
}

impl EndpointResolver {
    /// Create a resolver over the given settings
    pub fn new(config: RemoteConfig, prompt: Arc<dyn HostPrompt>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ResolverState {
                config,
                cached: None,
            })),
            prompt,
        }
    }

    /// Create a resolver that never prompts
    pub fn non_interactive(config: RemoteConfig) -> Self {
        Self::new(config, Arc::new(NoPrompt))
    }

    /// Snapshot of the settings the resolver reads from
    pub async fn config(&self) -> RemoteConfig {
        self.state.lock().await.config.clone()
    }

    /// Resolve the endpoint, asking the operator for a missing host
    ///
    /// The prompt runs on the blocking pool. The state lock is held until it
    /// answers, so concurrent callers wait for the same answer.
    pub async fn resolve(&self) -> Result<Endpoint> {
        let mut state = self.state.lock().await;
        if let Some(endpoint) = &state.cached {
            return Ok(endpoint.clone());
        }

        let configured = state.config.host.clone().filter(|h| !h.is_empty());
        let host = match configured {
            Some(host) => host,
            None => {
                let prompt = Arc::clone(&self.prompt);
                let answer = tokio::task::spawn_blocking(move || prompt.prompt_host())
                    .await
                    .map_err(|e| {
                        RemoteError::ConfigurationIncomplete(format!("host prompt failed: {}", e))
                    })?
                    .map(|h| h.trim().to_string())
                    .filter(|h| !h.is_empty())
                    .ok_or_else(|| {
                        RemoteError::ConfigurationIncomplete(
                            "no host configured for the remote console".to_string(),
                        )
                    })?;
                state.config.host = Some(answer.clone());
                answer
            }
        };

        let endpoint = Endpoint::new(host, state.config.port);
        info!("Remote console endpoint resolved to {}", endpoint);
        state.cached = Some(endpoint.clone());
        Ok(endpoint)
    }

    /// Replace the settings and forget the cached endpoint
    pub async fn reconfigure(&self, config: RemoteConfig) {
        let mut state = self.state.lock().await;
        state.config = config;
        state.cached = None;
    }
}

impl std::fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.try_lock() {
            Ok(state) => f
                .debug_struct("EndpointResolver")
                .field("config", &state.config)
                .field("cached", &state.cached)
                .finish(),
            Err(_) => f.debug_struct("EndpointResolver").finish_non_exhaustive(),
        }
    }
}
