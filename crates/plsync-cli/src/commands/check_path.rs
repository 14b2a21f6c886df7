//! Check-path command implementation

use colored::Colorize;
use plsync_fs::{NormalizedPath, verify_library_path};

use crate::context::AppContext;
use crate::error::{CliError, Result};

/// Run the check-path command
///
/// Paths are made relative to the configured library root when a
/// configuration is available; otherwise they are checked as given.
pub fn run_check_path(ctx: &AppContext, paths: &[String]) -> Result<()> {
    let root = ctx.optional_config().map(|config| config.library.local_root);

    let mut invalid = 0;
    for raw in paths {
        let key = match &root {
            Some(root) => root.normalize(raw),
            None => NormalizedPath::new(raw),
        };
        match verify_library_path(key.as_str()) {
            None => println!("{} {}", "OK".green().bold(), key),
            Some(reason) => {
                invalid += 1;
                println!("{} {}: {}", "INVALID".red().bold(), key, reason);
            }
        }
    }

    if invalid > 0 {
        Err(CliError::user(format!(
            "{invalid} path(s) do not follow the naming convention"
        )))
    } else {
        Ok(())
    }
}
