//! Configuration and controller setup shared by the commands

use std::path::{Path, PathBuf};

use plsync_core::{ConfigResolver, SyncConfig, SyncController};

use crate::error::Result;

/// Global options every command may need.
#[derive(Debug, Clone, Default)]
pub struct AppContext {
    pub working_dir: PathBuf,
    pub config_file: Option<PathBuf>,
    pub password: Option<String>,
}

impl AppContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            ..Self::default()
        }
    }

    fn resolver(&self) -> ConfigResolver {
        let resolver = ConfigResolver::new(&self.working_dir);
        match &self.config_file {
            Some(file) => resolver.with_explicit_file(file),
            None => resolver,
        }
    }

    /// Resolve and validate configuration from every source.
    pub fn config(&self) -> Result<SyncConfig> {
        let resolver = self.resolver();
        tracing::debug!(sources = ?resolver.sources(), "Resolving configuration");
        Ok(resolver.resolve()?)
    }

    /// Configuration if one resolves, for commands that can work without.
    pub fn optional_config(&self) -> Option<SyncConfig> {
        match self.config() {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::debug!(error = %e, "No usable configuration");
                None
            }
        }
    }

    /// A controller for the configured host, with the secret from
    /// `--password` / `PLSYNC_PASSWORD` already cached.
    pub fn controller(&self) -> Result<SyncController> {
        let controller = SyncController::new(self.config()?);
        if let Some(secret) = &self.password {
            controller.session().renew(secret.as_str());
        }
        Ok(controller)
    }

    /// Resolve `path` against the working directory.
    pub fn path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }
}
