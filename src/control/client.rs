//! Command client: the calling side of the remote channel
//!
//! The client connects lazily on the first call and keeps the connection for
//! later calls. Every failure is logged and reported to the caller as `None`.

use crate::config::{validate_port, SecurityMode};
use crate::control::{ApiRequest, ApiResponse, RemoteCall};
use crate::endpoint::{Endpoint, EndpointResolver};
use crate::error::{log_null_argument, RemoteError, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

/// Connection state of a command client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection opened yet
    Unconnected,
    /// Connection open and reusable
    Connected,
    /// Connection closed explicitly
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unconnected => write!(f, "unconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    async fn open(endpoint: &Endpoint) -> Result<Self> {
        let addrs = endpoint.socket_addrs().await?;
        let stream = TcpStream::connect(&addrs[..]).await.map_err(|e| {
            RemoteError::Transport(format!("Failed to connect to {}: {}", endpoint, e))
        })?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    async fn round_trip(&mut self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut request_str = request.to_json()?;
        request_str.push('\n');

        self.writer
            .write_all(request_str.as_bytes())
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to write request: {}", e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to flush request: {}", e)))?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to read response: {}", e)))?;
        if read == 0 {
            return Err(RemoteError::Transport(
                "Connection closed by remote console server".to_string(),
            ));
        }

        Ok(ApiResponse::from_json(line.trim())?)
    }
}

/// Client relaying commands to a remote command service
pub struct CommandClient {
    resolver: EndpointResolver,
    connection: Option<Connection>,
    state: ConnectionState,
    next_id: u64,
}

impl CommandClient {
    /// Create an unconnected client
    pub fn new(resolver: EndpointResolver) -> Self {
        Self {
            resolver,
            connection: None,
            state: ConnectionState::Unconnected,
            next_id: 1,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Relay one command and return the remote reply
    pub async fn send(&mut self, input: &str) -> Option<String> {
        if input.is_empty() {
            log_null_argument("input");
            return None;
        }

        let call = RemoteCall::HandleCommand {
            input: input.to_string(),
        };
        match self.call(call).await {
            Ok(result) => result,
            Err(e) => {
                error!("Remote command failed: {}", e);
                None
            }
        }
    }

    /// Query the remote status snapshot
    pub async fn status(&mut self) -> Option<String> {
        match self.call(RemoteCall::GetStatus).await {
            Ok(result) => result,
            Err(e) => {
                error!("Remote status query failed: {}", e);
                None
            }
        }
    }

    /// Close the connection; safe to call repeatedly
    pub async fn close(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        if let Err(e) = connection.writer.shutdown().await {
            warn!("Failed to close remote console connection cleanly: {}", e);
        }
        self.state = ConnectionState::Closed;
        debug!("Remote console connection closed");
    }

    async fn call(&mut self, call: RemoteCall) -> Result<Option<String>> {
        let endpoint = self.resolver.resolve().await?;
        let config = self.resolver.config().await;
        let timeout = config.send_timeout();

        if let RemoteCall::HandleCommand { input } = &call {
            info!("Sending command: {} to remote console on {}...", input, endpoint);
        }

        let exchange = self.exchange(&endpoint, config.security, call);
        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                self.discard_connection();
                Err(e)
            }
            Err(_) => {
                self.discard_connection();
                Err(RemoteError::Timeout(format!(
                    "no reply from {} within {:?}",
                    endpoint, timeout
                )))
            }
        }
    }

    async fn exchange(
        &mut self,
        endpoint: &Endpoint,
        security: SecurityMode,
        call: RemoteCall,
    ) -> Result<Option<String>> {
        let request = ApiRequest::new(self.request_id(), endpoint.path.clone(), call);
        let connection = self.connect(endpoint, security).await?;
        let response = connection.round_trip(&request).await?;

        if response.id != request.id {
            return Err(RemoteError::Transport(format!(
                "Response id {} does not match request {}",
                response.id, request.id
            )));
        }

        if !response.success {
            let reason = response
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unspecified failure".to_string());
            return Err(RemoteError::Transport(format!(
                "Remote console server reported: {}",
                reason
            )));
        }

        Ok(response.result)
    }

    async fn connect(
        &mut self,
        endpoint: &Endpoint,
        security: SecurityMode,
    ) -> Result<&mut Connection> {
        let connection = match self.connection.take() {
            Some(connection) => connection,
            None => {
                validate_port(endpoint.port)?;
                endpoint.check_security(security)?;
                let connection = Connection::open(endpoint).await?;
                debug!("Connected to remote console on {}", endpoint);
                self.state = ConnectionState::Connected;
                connection
            }
        };
        Ok(self.connection.insert(connection))
    }

    fn discard_connection(&mut self) {
        if self.connection.take().is_some() {
            self.state = ConnectionState::Unconnected;
        }
    }

    fn request_id(&mut self) -> String {
        let id = format!("req-{}", self.next_id);
        self.next_id += 1;
        id
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("state", &self.state)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}
