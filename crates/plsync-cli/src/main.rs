//! plsync CLI
//!
//! Compares playlists with their copies on a remote music library and
//! copies or deletes tracks until both sides match.

mod cli;
mod commands;
mod context;
mod error;
mod interactive;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use commands::SyncArgs;
use context::AppContext;
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: could not set up logging: {}", "warning".yellow().bold(), e);
    }
    tracing::debug!("Verbose mode enabled");

    let ctx = AppContext {
        working_dir: std::env::current_dir()?,
        config_file: cli.config,
        password: cli.password,
    };

    match cli.command {
        Some(cmd) => execute_command(&ctx, cmd).await,
        None => {
            // No command provided - show help hint
            println!("{} playlist sync", "plsync".green().bold());
            println!();
            println!("Run {} for available commands.", "plsync --help".cyan());
            Ok(())
        }
    }
}

async fn execute_command(ctx: &AppContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Connect => commands::run_connect(ctx).await,
        Commands::Analyze { playlist, json } => commands::run_analyze(ctx, &playlist, json).await,
        Commands::Sync {
            playlist,
            push,
            pull,
            delete_remote,
            delete_local,
            rewrite_manifest,
            yes,
            dry_run,
        } => {
            let args = SyncArgs {
                push,
                pull,
                delete_remote,
                delete_local,
                rewrite_manifest,
                yes,
                dry_run,
            };
            commands::run_sync(ctx, &playlist, args).await
        }
        Commands::Backups { action } => commands::run_backups(ctx, action),
        Commands::CheckPath { paths } => commands::run_check_path(ctx, &paths),
    }
}
