//! Configuration resolution with layered merge

use std::path::{Path, PathBuf};

use super::file::ConfigFile;
use crate::{Error, Result, SyncConfig};

const APP_DIR: &str = "plsync";
const GLOBAL_FILE: &str = "config.toml";
const PROJECT_FILE: &str = "plsync.toml";

/// Finds and merges configuration files.
///
/// Missing global and project files are skipped; a missing explicit file is
/// an error. Invalid TOML in any layer is an error.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    /// Directory searched for `plsync.toml`
    working_dir: PathBuf,

    /// File named with `--config`
    explicit: Option<PathBuf>,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            explicit: None,
            global_config_dir_override: None,
        }
    }

    /// Use a custom global config directory instead of the platform one.
    pub fn with_global_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.global_config_dir_override = Some(dir.into());
        self
    }

    /// Layer an explicitly named file on top of the discovered ones.
    pub fn with_explicit_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join(APP_DIR))
    }

    /// Candidate files in merge order, whether or not they exist.
    fn candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = self.global_config_dir() {
            paths.push(dir.join(GLOBAL_FILE));
        }
        paths.push(self.working_dir.join(PROJECT_FILE));
        paths
    }

    /// Files that will actually be merged, in order.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .candidates()
            .into_iter()
            .filter(|p| p.is_file())
            .collect();
        if let Some(explicit) = &self.explicit {
            found.push(explicit.clone());
        }
        found
    }

    /// Merge all layers without validating.
    pub fn load(&self) -> Result<ConfigFile> {
        if let Some(explicit) = &self.explicit
            && !explicit.is_file()
        {
            return Err(Error::config(format!(
                "config file not found: {}",
                explicit.display()
            )));
        }

        let mut merged = ConfigFile::default();
        for path in self.sources() {
            tracing::debug!(path = %path.display(), "Loading config layer");
            merged.merge(&ConfigFile::load(&path)?);
        }
        Ok(merged)
    }

    /// Merge all layers and validate the result.
    pub fn resolve(&self) -> Result<SyncConfig> {
        let sources = self.sources();
        if sources.is_empty() {
            return Err(Error::config(format!(
                "no configuration found; create {} or {}",
                self.working_dir.join(PROJECT_FILE).display(),
                self.global_config_dir()
                    .map(|d| d.join(GLOBAL_FILE).display().to_string())
                    .unwrap_or_else(|| GLOBAL_FILE.to_string())
            )));
        }
        self.load()?.into_config()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
