//! Sync command implementation
//!
//! Derives the operation sets from a fresh comparison, confirms deletions,
//! runs the plan and compares again to report convergence.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use plsync_core::{BackupListener, BackupRecord, Selection, SyncKind, SyncPlan, SyncReport};

use super::connect::ensure_connected;
use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::interactive::confirm_deletions;

/// Flags of the sync command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncArgs {
    pub push: bool,
    pub pull: bool,
    pub delete_remote: bool,
    pub delete_local: bool,
    pub rewrite_manifest: bool,
    pub yes: bool,
    pub dry_run: bool,
}

impl SyncArgs {
    fn selection(&self) -> Selection {
        Selection {
            push: self.push,
            pull: self.pull,
            delete_remote: self.delete_remote,
            delete_local: self.delete_local,
        }
    }

    fn has_operation(&self) -> bool {
        self.push || self.pull || self.delete_remote || self.delete_local
    }
}

/// Prints backup paths as they are created.
struct BackupNotice;

impl BackupListener for BackupNotice {
    fn backup_created(&self, record: &BackupRecord) {
        println!(
            "{} Backed up playlist to {}",
            "=>".blue().bold(),
            record.path.display().to_string().dimmed()
        );
    }
}

/// Run the sync command
pub async fn run_sync(ctx: &AppContext, playlist: &Path, args: SyncArgs) -> Result<()> {
    if !args.has_operation() {
        return Err(CliError::user(
            "Nothing to do: pass at least one of --push, --pull, --delete-remote, --delete-local.",
        ));
    }

    let controller = ctx.controller()?.with_backup_listener(Arc::new(BackupNotice));
    let playlist = ctx.path(playlist);
    ensure_connected(&controller).await?;

    let before = controller.analyze(&playlist, None).await?;
    if !before.exists_remotely {
        return Err(CliError::user(format!(
            "{} was not found on the remote host; nothing to compare against.",
            playlist.display()
        )));
    }

    let plan = SyncPlan::from_comparison(&before, controller.config().library_root(), args.selection())?
        .with_manifest_rewrite(args.rewrite_manifest);
    if plan.is_empty() {
        println!("{} Nothing to sync.", "OK".green().bold());
        return Ok(());
    }

    print_plan(&plan);
    if args.dry_run {
        println!();
        println!("{} Dry run, nothing was changed.", "=>".blue().bold());
        return Ok(());
    }
    if plan.destructive_count() > 0 && !args.yes && !confirm_deletions(&plan)? {
        return Err(CliError::user("Sync cancelled."));
    }

    let progress = |percent: u8| tracing::debug!(percent, "Sync progress");
    let report = controller.sync(&playlist, &plan, Some(&progress)).await?;
    print_report(&report);

    let after = controller.analyze(&playlist, None).await?;
    if after.is_in_sync() {
        println!("{} Both sides now list the same tracks.", "OK".green().bold());
    } else {
        println!(
            "{} {} missing remotely, {} missing locally remain.",
            "=>".blue().bold(),
            after.missing_remotely.len(),
            after.missing_locally.len()
        );
        if !args.rewrite_manifest {
            println!("Pass {} to update the playlists too.", "--rewrite-manifest".cyan());
        }
    }
    Ok(())
}

fn describe(kind: SyncKind) -> colored::ColoredString {
    match kind {
        SyncKind::AddToRemote => "upload".green(),
        SyncKind::AddToLocal => "download".green(),
        SyncKind::DeleteFromRemote => "delete remote".red(),
        SyncKind::DeleteFromLocal => "delete local".red(),
    }
}

fn print_plan(plan: &SyncPlan) {
    println!("{}", "Planned changes:".bold());
    for (kind, keys) in plan.operations() {
        for key in keys {
            println!("  {:>13} {}", describe(kind), key);
        }
    }
    if plan.rewrite_manifests {
        println!("  {:>13} both playlist files", "rewrite".yellow());
    }
}

fn print_report(report: &SyncReport) {
    println!(
        "{} {} completed, {} skipped",
        "OK".green().bold(),
        report.completed.len(),
        report.skipped.len()
    );
    for item in &report.skipped {
        println!("  {} {} {}", "~".yellow(), item.kind, item.path.to_string().dimmed());
    }
    if report.manifest_rewritten {
        println!("{} Playlist files rewritten", "OK".green().bold());
    }
}
