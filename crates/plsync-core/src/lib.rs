//! Core orchestration layer for plsync
//!
//! This crate sits between the filesystem and transport crates and the CLI,
//! implementing:
//!
//! - **Configuration resolution**: global, project and explicit TOML files
//!   merged into a validated [`SyncConfig`]
//! - **DiffEngine**: local/remote manifest comparison
//! - **BackupManager**: verified, timestamped manifest backups and the
//!   guarded write used for restores and manifest rewrites
//! - **SyncOrchestrator**: file-by-file application of a [`SyncPlan`]
//! - **SyncController**: owns the shared session and builds the above
//!
//! # Architecture
//!
//! ```text
//!                  plsync-cli
//!                      |
//!                 plsync-core
//!                      |
//!          +-----------+-----------+
//!          |                       |
//!      plsync-fs           plsync-transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use plsync_core::{ConfigResolver, SyncController};
//!
//! async fn example(playlist: &std::path::Path) -> plsync_core::Result<()> {
//!     let config = ConfigResolver::new(std::env::current_dir()?).resolve()?;
//!     let controller = SyncController::new(config);
//!     let result = controller.analyze(playlist, None).await?;
//!     println!("{} tracks missing remotely", result.missing_remotely.len());
//!     Ok(())
//! }
//! ```

pub mod backup;
pub mod config;
pub mod controller;
pub mod diff;
pub mod error;
pub mod progress;
pub mod sync;

pub use backup::{BackupEntry, BackupManager, BackupRecord, GuardedWrite};
pub use config::{ConfigFile, ConfigResolver, SyncConfig};
pub use controller::SyncController;
pub use diff::{ComparisonResult, DiffEngine, InvalidPath};
pub use error::{Error, ErrorKind, Result};
pub use progress::{Liveness, Progress};
pub use sync::{
    BackupListener, Selection, SyncItem, SyncKind, SyncOrchestrator, SyncPlan, SyncReport,
    SyncRequest,
};
