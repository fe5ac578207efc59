//! Remote call request and response types
//!
//! Requests and responses travel as one JSON document per line. Every
//! request names the service path it targets and carries one [`RemoteCall`].

use crate::error::RemoteError;
use serde::{Deserialize, Serialize};

/// Operations exposed by the command service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteCall {
    /// Query the status snapshot
    GetStatus,
    /// Execute one command
    HandleCommand {
        /// Raw command text, without trigger character
        #[serde(default)]
        input: String,
    },
}

/// API request from client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Request ID for tracking
    #[serde(default = "default_request_id")]
    pub id: String,

    /// Service path the request targets
    pub service: String,

    /// Operation to perform
    pub call: RemoteCall,
}

impl ApiRequest {
    /// Create a new API request
    pub fn new(id: String, service: String, call: RemoteCall) -> Self {
        Self { id, service, call }
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::ParseError(e.to_string()))
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}

/// API response to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Request ID this response corresponds to
    pub id: String,

    /// Whether the call completed
    pub success: bool,

    /// Result string; absent when the service returned nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Optional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Create a successful response
    pub fn success(id: String, result: Option<String>) -> Self {
        Self {
            id,
            success: true,
            result,
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: String, error: ApiError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(error),
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        serde_json::from_str(json).map_err(|e| ApiError::ParseError(e.to_string()))
    }
}

/// API error types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum ApiError {
    /// Failed to parse request
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize response
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Request addressed a service path this listener does not host
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<ApiError> for RemoteError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::SerializationError(msg) => RemoteError::Serialization(msg),
            other => RemoteError::Transport(other.to_string()),
        }
    }
}

fn default_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("req-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}
