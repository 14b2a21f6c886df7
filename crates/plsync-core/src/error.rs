//! Error types for plsync-core

use std::fmt;
use std::path::PathBuf;

use plsync_transport::TransportError;

/// Result type for plsync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classes callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Authentication failure, timeout or unreachable host; retry after re-prompting
    Connection,
    /// A file or playlist that was expected is absent
    NotFound,
    /// A remote operation that should have succeeded exited non-zero
    Transport,
    /// A checksum or read-back verification failed
    Integrity,
    /// The request itself is malformed
    Validation,
    Io,
    Config,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::NotFound => "not found",
            Self::Transport => "transport",
            Self::Integrity => "integrity",
            Self::Validation => "validation",
            Self::Io => "io",
            Self::Config => "config",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in plsync-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Could not talk to the remote host at all
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// Any other transport failure
    #[error(transparent)]
    Transport(TransportError),

    /// The remote manifest was fetched but could not be read
    #[error("Remote manifest {path} unreadable: {reason}")]
    RemoteManifestUnreadable { path: String, reason: String },

    /// Content did not match after a copy or write
    #[error("Integrity check failed for {path}: expected {expected}, found {actual}")]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// A failed write could not be rolled back; manual recovery needed
    #[error("Rollback of {path} failed after '{cause}': {rollback}")]
    RollbackFailed {
        path: PathBuf,
        cause: String,
        rollback: String,
    },

    #[error("Backup not found: {path}")]
    BackupNotFound { path: PathBuf },

    #[error("Invalid sync request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    /// Filesystem error from plsync-fs
    #[error(transparent)]
    Fs(#[from] plsync_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        if err.is_connection() {
            Self::Connection(err)
        } else {
            Self::Transport(err)
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Transport(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::Transport(TransportError::Io { .. }) => ErrorKind::Io,
            Self::Transport(_) | Self::RemoteManifestUnreadable { .. } => ErrorKind::Transport,
            Self::Integrity { .. } | Self::RollbackFailed { .. } => ErrorKind::Integrity,
            Self::BackupNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRequest { .. } => ErrorKind::Validation,
            Self::Config { .. } | Self::ConfigParse { .. } => ErrorKind::Config,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Fs(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::Fs(_) | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Rollback failures leave a file in an unknown state.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
