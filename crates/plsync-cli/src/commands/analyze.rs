//! Analyze command implementation
//!
//! Compares a local playlist with its remote copy and prints the difference.

use std::path::Path;

use colored::Colorize;
use plsync_core::ComparisonResult;

use super::connect::ensure_connected;
use crate::context::AppContext;
use crate::error::Result;

/// Run the analyze command
pub async fn run_analyze(ctx: &AppContext, playlist: &Path, json: bool) -> Result<()> {
    let controller = ctx.controller()?;
    let playlist = ctx.path(playlist);
    ensure_connected(&controller).await?;

    let progress = |percent: u8| tracing::debug!(percent, "Analyze progress");
    let result = controller.analyze(&playlist, Some(&progress)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_comparison(&result, &playlist);
    }
    Ok(())
}

fn display_name(playlist: &Path) -> String {
    playlist
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| playlist.display().to_string())
}

/// Print human-readable comparison output
pub fn print_comparison(result: &ComparisonResult, playlist: &Path) {
    let name = display_name(playlist);

    if !result.exists_remotely {
        println!(
            "{} {} was not found on the remote host.",
            "NOT FOUND".yellow().bold(),
            name.cyan()
        );
        return;
    }

    if result.is_in_sync() {
        println!(
            "{} {} is in sync ({} tracks).",
            "OK".green().bold(),
            name.cyan(),
            result.total_files
        );
    } else {
        println!(
            "{} {} ({} tracks locally)",
            "Diff".blue().bold(),
            name.cyan(),
            result.total_files
        );
        if !result.missing_remotely.is_empty() {
            println!();
            println!(
                "{}",
                format!("Missing remotely ({}):", result.missing_remotely.len()).bold()
            );
            for path in &result.missing_remotely {
                println!("  {} {}", "+".green(), path.display());
            }
        }
        if !result.missing_locally.is_empty() {
            println!();
            println!(
                "{}",
                format!("Missing locally ({}):", result.missing_locally.len()).bold()
            );
            for path in &result.missing_locally {
                println!("  {} {}", "-".yellow(), path.display());
            }
        }
        println!();
        println!(
            "Run {} to apply changes.",
            format!("plsync sync {name} --push|--pull").cyan()
        );
    }

    if result.has_invalid_paths {
        println!();
        println!(
            "{}",
            "Paths outside the naming convention:".yellow().bold()
        );
        for invalid in &result.invalid_paths {
            println!("  {} {}: {}", "!".yellow(), invalid.path, invalid.reason.dimmed());
        }
    }
}
