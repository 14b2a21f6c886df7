//! The transport seam

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Captured result of a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Time limits for transport operations.
///
/// Generic command execution is deliberately unbounded; only the connection
/// test and single-file copies carry a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub transfer: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            transfer: Duration::from_secs(30),
        }
    }
}

/// Remote command execution and single-file copy against one host.
///
/// Implementations report typed failures; they never retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Run a trivial remote echo within the connect timeout.
    async fn test(&self) -> Result<()>;

    /// Copy a remote file to a local path.
    ///
    /// A missing remote file is reported as `TransportError::NotFound`.
    async fn copy_in(&self, remote: &str, local: &Path) -> Result<()>;

    /// Copy a local file to a remote path.
    async fn copy_out(&self, local: &Path, remote: &str) -> Result<()>;

    /// Remove a remote file; fails with `CommandFailed` on non-zero exit.
    async fn remove(&self, remote: &str) -> Result<()>;

    /// Run an arbitrary remote shell command. Non-zero exit codes are
    /// returned in the output, not as errors.
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}
