//! Applying comparison results
//!
//! - **plan**: the four disjoint operation sets a caller asks for
//! - **orchestrator**: runs a plan file by file, backing up the local
//!   playlist first whenever local files change
//! - **rewrite**: case-insensitive, order-preserving manifest edits

mod orchestrator;
mod plan;
mod rewrite;

pub use orchestrator::{BackupListener, SyncItem, SyncOrchestrator, SyncReport};
pub use plan::{Selection, SyncKind, SyncPlan, SyncRequest};
