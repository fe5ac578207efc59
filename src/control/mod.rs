//! Remote command channel
//!
//! This module provides the command service that accepts text commands over
//! TCP, the client that relays them, and the handler that forwards them to the
//! command processor.

mod api;
mod client;
mod console;
mod handler;
mod server;

pub use api::{ApiError, ApiRequest, ApiResponse, RemoteCall};
pub use client::{CommandClient, ConnectionState};
pub use console::RemoteConsole;
pub use handler::{CommandHandler, EMPTY_STATUS, NO_BOTS_MESSAGE, REFUSAL_MESSAGE};
pub use server::{CommandService, ServiceState};
