//! Backups command implementation

use std::path::Path;

use colored::Colorize;

use crate::cli::BackupAction;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::interactive::confirm;

/// Run a backups subcommand
pub fn run_backups(ctx: &AppContext, action: BackupAction) -> Result<()> {
    match action {
        BackupAction::List { playlist, json } => list(ctx, &playlist, json),
        BackupAction::Restore {
            playlist,
            backup,
            yes,
        } => restore(ctx, &playlist, backup.as_deref(), yes),
        BackupAction::Prune { playlist, keep } => prune(ctx, &playlist, keep),
    }
}

fn list(ctx: &AppContext, playlist: &Path, json: bool) -> Result<()> {
    let controller = ctx.controller()?;
    let playlist = ctx.path(playlist);
    let backups = controller.list_backups(&playlist)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&backups)?);
        return Ok(());
    }
    if backups.is_empty() {
        println!("No backups of {}", playlist.display());
        return Ok(());
    }
    println!(
        "{} {} ({})",
        "Backups".blue().bold(),
        playlist.display(),
        backups.len()
    );
    for entry in &backups {
        println!(
            "  {}  {:>8}  {}",
            entry.modified.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            entry.size,
            entry.path.display()
        );
    }
    Ok(())
}

fn restore(ctx: &AppContext, playlist: &Path, backup: Option<&Path>, yes: bool) -> Result<()> {
    let controller = ctx.controller()?;
    let playlist = ctx.path(playlist);
    let backup = match backup {
        Some(path) => ctx.path(path),
        None => controller
            .list_backups(&playlist)?
            .into_iter()
            .next()
            .map(|entry| entry.path)
            .ok_or_else(|| CliError::user(format!("No backups of {}", playlist.display())))?,
    };

    if !yes
        && !confirm(&format!(
            "Replace {} with {}?",
            playlist.display(),
            backup.display()
        ))?
    {
        return Err(CliError::user("Restore cancelled."));
    }

    let previous = controller.restore_backup(&backup, &playlist)?;
    println!(
        "{} Restored {} from {}",
        "OK".green().bold(),
        playlist.display(),
        backup.display()
    );
    if let Some(record) = previous {
        println!("   Previous content saved to {}", record.path.display());
    }
    Ok(())
}

fn prune(ctx: &AppContext, playlist: &Path, keep: Option<usize>) -> Result<()> {
    if keep == Some(0) {
        return Err(CliError::user("--keep must be at least 1"));
    }
    let controller = ctx.controller()?;
    let playlist = ctx.path(playlist);
    let removed = controller.cleanup_backups(&playlist, keep)?;

    if removed.is_empty() {
        println!("{} Nothing to prune.", "OK".green().bold());
    } else {
        for path in &removed {
            println!("  {} {}", "-".red(), path.display());
        }
        println!("{} Removed {} old backup(s).", "OK".green().bold(), removed.len());
    }
    Ok(())
}
