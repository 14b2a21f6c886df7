//! On-disk configuration file format
//!
//! Every field is optional here so partial files can be layered; required
//! fields are checked when the merged file is turned into a [`SyncConfig`].

use std::path::{Path, PathBuf};

use plsync_transport::Toolchain;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, SyncConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySection {
    pub local_root: Option<String>,
    pub playlists_dir: Option<PathBuf>,
    /// Track extensions considered by the diff; empty means every entry
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    pub host: Option<String>,
    pub username: Option<String>,
    pub root: Option<String>,
    pub port: Option<u16>,
    pub flavor: Option<Toolchain>,
    pub connect_timeout_secs: Option<u64>,
    pub transfer_timeout_secs: Option<u64>,
    pub max_auth_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupSection {
    pub dir: Option<PathBuf>,
    pub keep: Option<usize>,
}

/// One configuration file, or the merge of several.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub library: LibrarySection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub backup: BackupSection,
}

fn overlay<T: Clone>(base: &mut Option<T>, top: &Option<T>) {
    if top.is_some() {
        base.clone_from(top);
    }
}

impl ConfigFile {
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| plsync_fs::Error::io(path, e))?;
        Self::parse(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge `other` into this file; fields set in `other` win.
    pub fn merge(&mut self, other: &ConfigFile) {
        overlay(&mut self.library.local_root, &other.library.local_root);
        overlay(&mut self.library.playlists_dir, &other.library.playlists_dir);
        overlay(&mut self.library.extensions, &other.library.extensions);

        overlay(&mut self.remote.host, &other.remote.host);
        overlay(&mut self.remote.username, &other.remote.username);
        overlay(&mut self.remote.root, &other.remote.root);
        overlay(&mut self.remote.port, &other.remote.port);
        overlay(&mut self.remote.flavor, &other.remote.flavor);
        overlay(&mut self.remote.connect_timeout_secs, &other.remote.connect_timeout_secs);
        overlay(&mut self.remote.transfer_timeout_secs, &other.remote.transfer_timeout_secs);
        overlay(&mut self.remote.max_auth_attempts, &other.remote.max_auth_attempts);

        overlay(&mut self.backup.dir, &other.backup.dir);
        overlay(&mut self.backup.keep, &other.backup.keep);
    }

    /// Validate required fields and apply defaults.
    pub fn into_config(self) -> Result<SyncConfig> {
        SyncConfig::try_from(self)
    }
}
