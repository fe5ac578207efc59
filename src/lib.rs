//! remote-console: a remote command channel for a bot host process
//!
//! A long-running host exposes a TCP service that accepts a single text
//! command, hands it to a command processor and returns the textual reply.
//! A companion client relays commands typed locally to a (possibly) remote
//! host.
//!
//! # Modules
//!
//! - `config`: Configuration parsing and validation
//! - `endpoint`: Endpoint resolution and the operator host prompt
//! - `control`: Command service, client and handler
//! - `processor`: The command processor seam and a built-in bot registry
//! - `privileges`: Privilege detection for bind failures
//! - `error`: Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod control;
pub mod endpoint;
pub mod error;
pub mod privileges;
pub mod processor;

// Re-export commonly used types
pub use error::{RemoteError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
