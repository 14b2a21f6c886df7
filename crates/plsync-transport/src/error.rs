//! Error types for transport operations

use std::path::PathBuf;

/// Errors that can occur while talking to the remote host
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operation did not finish within its time limit
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// What was being attempted
        operation: String,
        /// The limit that was exceeded
        seconds: u64,
    },

    /// The remote host rejected the credentials
    #[error("Authentication failed for {user}@{host}: {message}")]
    AuthFailed {
        user: String,
        host: String,
        message: String,
    },

    /// The host could not be reached at all
    #[error("Host {host} unreachable: {message}")]
    Unreachable { host: String, message: String },

    /// The external toolchain binary could not be launched
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A remote command that was expected to succeed exited non-zero
    #[error("Remote command failed (exit code {code}): {stderr}")]
    CommandFailed {
        /// Exit code of the remote command or copy tool
        code: i32,
        /// Captured stderr output
        stderr: String,
    },

    /// The remote file does not exist
    #[error("Remote file not found: {path}")]
    NotFound { path: String },

    /// Local I/O failed while preparing or receiving a transfer
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TransportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Failures that mean "could not talk to the host" rather than "the
    /// host said no": auth, timeout, unreachable and spawn errors.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::AuthFailed { .. } | Self::Unreachable { .. } | Self::Spawn { .. }
        )
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;
