//! Interactive prompts for CLI commands
//!
//! Uses dialoguer for the secret prompt and destructive-action confirmation.

use std::io::IsTerminal;

use colored::Colorize;
use dialoguer::{Confirm, Password};
use plsync_core::{SyncKind, SyncPlan};
use plsync_transport::{Credentials, SecretPrompt};

use crate::error::{CliError, Result};

/// Asks for the remote password on the terminal.
///
/// Without a terminal there is nobody to ask, so the login is abandoned.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt(&self, credentials: &Credentials, attempt: u32, reason: &str) -> Option<String> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        eprintln!("{} {}", "!".yellow().bold(), reason);
        Password::new()
            .with_prompt(format!(
                "Password for {} (attempt {})",
                credentials.destination(),
                attempt
            ))
            .interact()
            .ok()
    }
}

/// One line per deleting operation set, e.g. `3 remote file(s)`.
pub fn deletion_summary(plan: &SyncPlan) -> Vec<String> {
    [
        (SyncKind::DeleteFromRemote, "remote"),
        (SyncKind::DeleteFromLocal, "local"),
    ]
    .into_iter()
    .filter(|(kind, _)| plan.len(*kind) > 0)
    .map(|(kind, side)| format!("{} {} file(s)", plan.len(kind), side))
    .collect()
}

/// Ask before deleting anything.
pub fn confirm_deletions(plan: &SyncPlan) -> Result<bool> {
    let summary = deletion_summary(plan);
    if summary.is_empty() {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::user(
            "Refusing to delete files without confirmation; pass --yes to proceed.",
        ));
    }

    println!("{}", "This will delete:".red().bold());
    for line in &summary {
        println!("  {} {}", "-".red(), line);
    }
    Ok(Confirm::new()
        .with_prompt("Proceed?")
        .default(false)
        .interact()?)
}

/// Generic yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::user(format!(
            "{prompt} Cannot ask without a terminal; pass --yes to proceed."
        )));
    }
    Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
}
