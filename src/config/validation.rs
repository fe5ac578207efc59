//! Configuration validation functions
//!
//! This module validates the remote channel settings: host syntax, port
//! range and send timeout.

use crate::error::{RemoteError, Result};
use std::net::IpAddr;

/// Validate a host (IP address or DNS name)
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(RemoteError::Config("Host cannot be empty".to_string()));
    }

    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    if host.len() > 253 {
        return Err(RemoteError::Config(format!(
            "Host '{}' exceeds maximum length of 253 characters",
            host
        )));
    }

    let labels_valid = host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    if !labels_valid {
        return Err(RemoteError::Config(format!(
            "Invalid host '{}' (expected IP address or hostname)",
            host
        )));
    }

    Ok(())
}

/// Validate a port a client connects to
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(RemoteError::Config(
            "Port number cannot be 0".to_string(),
        ));
    }
    Ok(())
}

/// Validate the client send timeout
pub fn validate_send_timeout(secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(RemoteError::Config(
            "Send timeout must be at least 1 second".to_string(),
        ));
    }
    Ok(())
}
