//! Connect command implementation

use colored::Colorize;
use plsync_core::{ErrorKind, SyncController};

use crate::context::AppContext;
use crate::error::{CliError, Result};
use crate::interactive::TerminalPrompt;

/// Log in, prompting on the terminal after an authentication failure.
///
/// Connection-class failures become a user error naming the host, so the
/// caller can tell them apart from a playlist that is simply absent.
pub async fn ensure_connected(controller: &SyncController) -> Result<()> {
    match controller.connect(&TerminalPrompt).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Connection => {
            let destination = controller.session().credentials().destination();
            Err(CliError::user(format!(
                "Connection to {destination} failed: {e}"
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the connect command
///
/// Tests the login and checks that the remote library root exists.
pub async fn run_connect(ctx: &AppContext) -> Result<()> {
    let controller = ctx.controller()?;
    let destination = controller.session().credentials().destination();
    println!("{} Connecting to {}...", "=>".blue().bold(), destination.cyan());

    ensure_connected(&controller).await?;
    println!("{} Connected to {}", "OK".green().bold(), destination);

    let root = &controller.config().remote.root;
    if controller.check_remote_root().await? {
        println!("{} Remote library root {} exists", "OK".green().bold(), root.cyan());
        Ok(())
    } else {
        Err(CliError::user(format!(
            "Remote library root {root} does not exist on {destination}"
        )))
    }
}
