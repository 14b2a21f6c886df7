//! Command implementations for plsync-cli

pub mod analyze;
pub mod backups;
pub mod check_path;
pub mod connect;
pub mod sync;

pub use analyze::run_analyze;
pub use backups::run_backups;
pub use check_path::run_check_path;
pub use connect::run_connect;
pub use sync::{SyncArgs, run_sync};
