//! Command service: the listening side of the remote channel
//!
//! This module binds a TCP listener on the resolved endpoint, accepts
//! connections and dispatches each decoded request to the handler. Start and
//! stop failures are logged here and never propagated.

use crate::control::{ApiError, ApiRequest, ApiResponse, CommandHandler};
use crate::endpoint::{Endpoint, EndpointResolver};
use crate::error::{RemoteError, Result};
use crate::privileges::{bind_denied_advice, PrivilegeLevel};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a command service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No listener
    Stopped,
    /// Listener bound and accepting
    Running,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

struct ListenerHandle {
    endpoint: Endpoint,
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Command service owning its listener
pub struct CommandService {
    resolver: EndpointResolver,
    handler: Arc<CommandHandler>,
    listener: Option<ListenerHandle>,
}

impl CommandService {
    /// Create a stopped service
    pub fn new(resolver: EndpointResolver, handler: Arc<CommandHandler>) -> Self {
        Self {
            resolver,
            handler,
            listener: None,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        if self.listener.is_some() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        }
    }

    /// Whether the listener is up
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Address the listener is bound to, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.local_addr)
    }

    /// Endpoint the listener serves, while running
    pub fn endpoint(&self) -> Option<&Endpoint> {
        self.listener.as_ref().map(|l| &l.endpoint)
    }

    /// Shared command handler
    pub fn handler(&self) -> &Arc<CommandHandler> {
        &self.handler
    }

    /// Start listening; a no-op when already running
    ///
    /// Failures are logged and leave the service stopped.
    pub async fn start(&mut self) {
        if self.is_running() {
            debug!("Remote console server already running");
            return;
        }

        let endpoint = match self.resolver.resolve().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                warn!("Remote console server not started: {}", e);
                return;
            }
        };

        info!("Starting remote console server on {}...", endpoint);

        match self.bind(endpoint).await {
            Ok(handle) => {
                info!("Remote console server ready on {}!", handle.local_addr);
                self.listener = Some(handle);
            }
            Err(RemoteError::BindDenied(addr)) => {
                error!(
                    "Remote console server could not be started because access to {} was denied!",
                    addr
                );
                let port = self.resolver.config().await.port;
                warn!("{}", bind_denied_advice(PrivilegeLevel::detect(), port));
            }
            Err(e) => {
                error!("Remote console server failed to start: {:?}", e);
            }
        }
    }

    /// Stop listening; a no-op when already stopped
    ///
    /// Close failures are logged; the service always ends up stopped.
    pub async fn stop(&mut self) {
        let Some(handle) = self.listener.take() else {
            return;
        };

        info!("Stopping remote console server on {}", handle.endpoint);

        if handle.shutdown.send(()).is_err() {
            warn!("Remote console accept loop had already exited");
        }

        if let Err(e) = handle.task.await {
            error!("Remote console server did not close cleanly: {}", e);
        }

        info!("Remote console server stopped");
    }

    async fn bind(&self, endpoint: Endpoint) -> Result<ListenerHandle> {
        endpoint.check_security(self.resolver.config().await.security)?;
        let addrs = endpoint.socket_addrs().await?;

        let listener = TcpListener::bind(&addrs[..])
            .await
            .map_err(|e| classify_bind_error(e, &endpoint))?;
        let local_addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.handler),
            endpoint.path.clone(),
            shutdown_rx,
        ));

        Ok(ListenerHandle {
            endpoint,
            local_addr,
            shutdown,
            task,
        })
    }
}

impl Drop for CommandService {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            let _ = handle.shutdown.send(());
            handle.task.abort();
        }
    }
}

impl std::fmt::Debug for CommandService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandService")
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

/// Map a bind failure; permission denial gets its own variant
fn classify_bind_error(e: std::io::Error, endpoint: &Endpoint) -> RemoteError {
    match e.kind() {
        ErrorKind::PermissionDenied => RemoteError::BindDenied(endpoint.to_string()),
        _ => RemoteError::Io(e),
    }
}

async fn accept_loop(
    listener: TcpListener,
    handler: Arc<CommandHandler>,
    service_path: String,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("New remote console connection from {}", peer);
                    connections.spawn(handle_connection(
                        stream,
                        Arc::clone(&handler),
                        service_path.clone(),
                    ));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            },
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                match finished {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("Connection handler error: {}", e),
                    Err(e) if e.is_panic() => error!("Connection handler panicked: {}", e),
                    Err(_) => {}
                }
            }
        }
    }

    connections.shutdown().await;
}

/// Handle a single client connection
async fn handle_connection(
    stream: TcpStream,
    handler: Arc<CommandHandler>,
    service_path: String,
) -> std::result::Result<(), ApiError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();

        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Client disconnected");
                break;
            }
            Ok(_) => {
                let request_str = line.trim();
                if request_str.is_empty() {
                    continue;
                }

                let response = match ApiRequest::from_json(request_str) {
                    Ok(request) => handler.handle_request(request, &service_path).await,
                    Err(e) => {
                        error!("Failed to parse request: {}", e);
                        ApiResponse::error("unknown".to_string(), e)
                    }
                };

                let mut response_str = response.to_json()?;
                response_str.push('\n');

                writer
                    .write_all(response_str.as_bytes())
                    .await
                    .map_err(|e| {
                        ApiError::InternalError(format!("Failed to write response: {}", e))
                    })?;

                writer.flush().await.map_err(|e| {
                    ApiError::InternalError(format!("Failed to flush response: {}", e))
                })?;
            }
            Err(e) => {
                error!("Failed to read from connection: {}", e);
                break;
            }
        }
    }

    Ok(())
}
