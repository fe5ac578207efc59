//! Privilege detection
//!
//! Used to tell the operator what to change when the OS refuses to bind the
//! service address.

/// Privilege level of the current process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// Running as root (Unix)
    Root,
    /// Running as regular user
    User,
    /// Unknown privilege level
    Unknown,
}

impl PrivilegeLevel {
    /// Detect current privilege level
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            // SAFETY: getuid/geteuid have no preconditions and cannot fail.
            let uid = unsafe { libc::getuid() };
            let euid = unsafe { libc::geteuid() };

            if uid == 0 || euid == 0 {
                return Self::Root;
            }
            Self::User
        }

        #[cfg(not(unix))]
        {
            Self::Unknown
        }
    }

    /// Check if elevated
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::Root)
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Root => write!(f, "root"),
            Self::User => write!(f, "user"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Operator advice for a refused bind
pub fn bind_denied_advice(level: PrivilegeLevel, port: u16) -> String {
    if level.is_elevated() {
        format!(
            "If you want to use the remote console, make sure no firewall or security policy blocks port {}",
            port
        )
    } else if port < 1024 {
        format!(
            "If you want to use the remote console, consider starting {} as {}, or choosing a port above 1023 instead of {}",
            crate::APP_NAME,
            if cfg!(windows) { "administrator" } else { "root" },
            port
        )
    } else {
        format!(
            "If you want to use the remote console, consider starting {} with elevated privileges, or allowing port {} through the firewall",
            crate::APP_NAME,
            port
        )
    }
}
