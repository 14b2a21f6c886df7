//! Resolved, validated configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use plsync_fs::LibraryRoot;
use plsync_transport::{Credentials, Timeouts, Toolchain};

use super::file::ConfigFile;
use crate::{Error, Result};

const DEFAULT_PORT: u16 = 22;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;
const DEFAULT_KEEP: usize = 5;
const BACKUP_DIR_NAME: &str = "backups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    pub local_root: LibraryRoot,
    pub playlists_dir: Option<PathBuf>,
    /// Lowercase extensions without the dot; empty accepts every entry
    pub extensions: Vec<String>,
}

impl LibraryConfig {
    pub fn new(local_root: LibraryRoot) -> Self {
        Self {
            local_root,
            playlists_dir: None,
            extensions: vec!["mp3".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub host: String,
    pub username: String,
    /// POSIX library root on the remote host
    pub root: String,
    pub port: u16,
    pub flavor: Toolchain,
    pub timeouts: Timeouts,
    pub max_auth_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Explicit backup directory; defaults to `<playlists_dir>/backups`
    pub dir: Option<PathBuf>,
    pub keep: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: None,
            keep: DEFAULT_KEEP,
        }
    }
}

/// Everything needed to talk to one remote library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub library: LibraryConfig,
    pub remote: RemoteConfig,
    pub backup: BackupConfig,
}

impl SyncConfig {
    /// Build a configuration in code, with defaults for everything else.
    pub fn new(local_root: impl AsRef<str>, credentials: &Credentials) -> Self {
        Self {
            library: LibraryConfig::new(LibraryRoot::new(local_root)),
            remote: RemoteConfig {
                host: credentials.host.clone(),
                username: credentials.username.clone(),
                root: credentials.remote_root.clone(),
                port: credentials.port,
                flavor: Toolchain::default(),
                timeouts: Timeouts::default(),
                max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
            },
            backup: BackupConfig::default(),
        }
    }

    pub fn library_root(&self) -> &LibraryRoot {
        &self.library.local_root
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.remote.host, &self.remote.username, &self.remote.root)
            .with_port(self.remote.port)
    }

    /// Where backups of `playlist` are kept.
    pub fn backup_dir_for(&self, playlist: &Path) -> PathBuf {
        if let Some(dir) = &self.backup.dir {
            return dir.clone();
        }
        if let Some(dir) = &self.library.playlists_dir {
            return dir.join(BACKUP_DIR_NAME);
        }
        playlist
            .parent()
            .map(|p| p.join(BACKUP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(BACKUP_DIR_NAME))
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::config(format!("missing required key '{key}'"))),
    }
}

impl TryFrom<ConfigFile> for SyncConfig {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let local_root = required(file.library.local_root, "library.local_root")?;
        let host = required(file.remote.host, "remote.host")?;
        let username = required(file.remote.username, "remote.username")?;
        let root = required(file.remote.root, "remote.root")?;

        if !root.starts_with('/') {
            return Err(Error::config(format!(
                "remote.root must be an absolute POSIX path, got '{root}'"
            )));
        }

        let keep = file.backup.keep.unwrap_or(DEFAULT_KEEP);
        if keep == 0 {
            return Err(Error::config("backup.keep must be at least 1"));
        }

        let extensions = file
            .library
            .extensions
            .unwrap_or_else(|| vec!["mp3".to_string()])
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            library: LibraryConfig {
                local_root: LibraryRoot::new(local_root),
                playlists_dir: file.library.playlists_dir,
                extensions,
            },
            remote: RemoteConfig {
                host,
                username,
                root: root.trim_end_matches('/').to_string(),
                port: file.remote.port.unwrap_or(DEFAULT_PORT),
                flavor: file.remote.flavor.unwrap_or_default(),
                timeouts: Timeouts {
                    connect: Duration::from_secs(
                        file.remote
                            .connect_timeout_secs
                            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
                    ),
                    transfer: Duration::from_secs(
                        file.remote
                            .transfer_timeout_secs
                            .unwrap_or(DEFAULT_TRANSFER_TIMEOUT_SECS),
                    ),
                },
                max_auth_attempts: file
                    .remote
                    .max_auth_attempts
                    .unwrap_or(DEFAULT_MAX_AUTH_ATTEMPTS)
                    .max(1),
            },
            backup: BackupConfig {
                dir: file.backup.dir,
                keep,
            },
        })
    }
}
