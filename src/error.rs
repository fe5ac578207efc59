//! Error types for remote-console
//!
//! This module defines the error types used throughout the application.
//! We use `thiserror` for ergonomic error definitions and `anyhow` for
//! error propagation in the binary.

use thiserror::Error;

/// Main error type for remote-console operations
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No host configured and the operator did not provide one
    #[error("Configuration incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// Empty or missing argument
    #[error("Invalid argument: {0} is null or empty")]
    InvalidArgument(&'static str),

    /// Binding the listener was refused by the OS
    #[error("Address access denied for {0}")]
    BindDenied(String),

    /// Transport failures (connect, read, write, remote fault)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Send timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Security policy rejected the operation
    #[error("Security error: {0}")]
    Security(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using RemoteError
pub type Result<T> = std::result::Result<T, RemoteError>;

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for RemoteError {
    fn from(err: toml::de::Error) -> Self {
        RemoteError::Config(err.to_string())
    }
}

/// Emit the diagnostic for an argument that was null or empty
pub fn log_null_argument(name: &'static str) {
    tracing::error!("{}", RemoteError::InvalidArgument(name));
}
