//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// plsync - Keep playlists in sync with a remote music library
#[derive(Parser, Debug)]
#[command(name = "plsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file, applied over the global and project files
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Secret for the remote login
    #[arg(long, global = true, env = "PLSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Test the connection, prompting for the secret when needed
    Connect,

    /// Compare a playlist with its remote copy
    Analyze {
        /// Local playlist file
        playlist: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Copy or delete tracks so both sides match
    ///
    /// Examples:
    ///   plsync sync mix.m3u --push                    # Upload tracks missing remotely
    ///   plsync sync mix.m3u --pull --rewrite-manifest # Download and list them locally
    ///   plsync sync mix.m3u --delete-remote --yes     # No confirmation prompt
    Sync {
        /// Local playlist file
        playlist: PathBuf,

        /// Upload tracks missing remotely
        #[arg(long)]
        push: bool,

        /// Download tracks missing locally
        #[arg(long)]
        pull: bool,

        /// Delete remote tracks the local playlist does not list
        #[arg(long)]
        delete_remote: bool,

        /// Delete local tracks the remote playlist does not list
        #[arg(long)]
        delete_local: bool,

        /// Also rewrite both playlist files to match
        #[arg(long)]
        rewrite_manifest: bool,

        /// Do not ask before deleting
        #[arg(short, long)]
        yes: bool,

        /// Show what would change without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage playlist backups
    Backups {
        #[command(subcommand)]
        action: BackupAction,
    },

    /// Check paths against the library naming convention
    CheckPath {
        /// Paths or library keys to check
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// Backup actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum BackupAction {
    /// List backups of a playlist, newest first
    List {
        playlist: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Restore a backup over the playlist
    Restore {
        playlist: PathBuf,

        /// Backup file to restore (default: the newest)
        #[arg(long)]
        backup: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Delete all but the newest backups
    Prune {
        playlist: PathBuf,

        /// How many to keep (default: from configuration)
        #[arg(long)]
        keep: Option<usize>,
    },
}
