//! Verified manifest backups
//!
//! Every mutation of a playlist file is preceded by a backup that is proven
//! byte-identical to its source. Backups live in a single directory and are
//! named `{stem}_{YYYYMMDD_HHMMSS}{suffix}`, so `mix.m3u` backed up at
//! 2024-01-01 00:00:00 becomes `mix_20240101_000000.m3u`.
//!
//! [`GuardedWrite`] packages the snapshot, attempt, verify and
//! commit-or-rollback sequence shared by restores and manifest rewrites.

mod guard;
mod manager;

pub use guard::GuardedWrite;
pub use manager::{BackupEntry, BackupManager, BackupRecord};
