//! Remote transport for plsync
//!
//! Everything that touches the remote host goes through the [`Transport`]
//! trait: a trivial connection test, single-file copies in both directions,
//! file removal and generic command execution. Two implementations ship:
//!
//! - [`SshTransport`] spawns an external secure-shell toolchain (OpenSSH
//!   `ssh`/`scp`, or PuTTY `plink`/`pscp`) with bounded timeouts.
//! - [`MemoryTransport`] keeps remote files in memory and can inject
//!   failures, for tests and dry runs.
//!
//! [`TransportClient`] sits on top and turns raw transport outcomes into the
//! structured results the sync layer consumes, handling authentication
//! retries against the shared [`Session`].

pub mod client;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod subprocess;
pub mod transport;

pub use client::{Transfer, TransportClient};
pub use credentials::{Credentials, SecretPrompt, Session};
pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use subprocess::{SshTransport, Toolchain, shell_quote};
pub use transport::{CommandOutput, Timeouts, Transport};
