//! Backup creation, listing, pruning and restore

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use plsync_fs::{Checksum, io};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::guard::GuardedWrite;
use crate::{Error, Result};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const DEFAULT_KEEP: usize = 5;

type Copier = Arc<dyn Fn(&Path, &Path) -> plsync_fs::Result<()> + Send + Sync>;
type Writer = Arc<dyn Fn(&Path, &[u8]) -> plsync_fs::Result<()> + Send + Sync>;

/// A backup that was created and verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub path: PathBuf,
    /// Checksum shared by the backup and its source at creation time
    pub checksum: Checksum,
    pub created: DateTime<Local>,
}

/// A backup found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub size: u64,
}

/// Creates, lists, prunes and restores manifest backups in one directory.
#[derive(Clone)]
pub struct BackupManager {
    dir: PathBuf,
    keep: usize,
    copier: Copier,
    writer: Writer,
}

impl fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupManager")
            .field("dir", &self.dir)
            .field("keep", &self.keep)
            .finish_non_exhaustive()
    }
}

/// Split `mix.m3u` into `("mix", ".m3u")`.
fn split_name(path: &Path) -> Result<(String, String)> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| plsync_fs::Error::NoFileName {
            path: path.to_path_buf(),
        })?;
    let suffix = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    Ok((stem, suffix))
}

fn copy_verbatim(source: &Path, dest: &Path) -> plsync_fs::Result<()> {
    io::copy_file(source, dest).map(|_| ())
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            keep: DEFAULT_KEEP,
            copier: Arc::new(copy_verbatim),
            writer: Arc::new(io::write_atomic),
        }
    }

    pub fn with_keep(mut self, keep: usize) -> Self {
        self.keep = keep.max(1);
        self
    }

    /// Replace the file copy used for backups, restores and rollbacks.
    pub fn with_copier<F>(mut self, copier: F) -> Self
    where
        F: Fn(&Path, &Path) -> plsync_fs::Result<()> + Send + Sync + 'static,
    {
        self.copier = Arc::new(copier);
        self
    }

    /// Replace the writer used by [`GuardedWrite::write`].
    pub fn with_writer<F>(mut self, writer: F) -> Self
    where
        F: Fn(&Path, &[u8]) -> plsync_fs::Result<()> + Send + Sync + 'static,
    {
        self.writer = Arc::new(writer);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    pub(crate) fn copy(&self, source: &Path, dest: &Path) -> plsync_fs::Result<()> {
        (self.copier)(source, dest)
    }

    pub(crate) fn write(&self, path: &Path, content: &[u8]) -> plsync_fs::Result<()> {
        (self.writer)(path, content)
    }

    /// The backup file name for `source` at time `at`.
    pub fn backup_name(source: &Path, at: DateTime<Local>) -> Result<String> {
        let (stem, suffix) = split_name(source)?;
        Ok(format!("{}_{}{}", stem, at.format(TIMESTAMP_FORMAT), suffix))
    }

    fn unused_path(&self, source: &Path, at: DateTime<Local>) -> Result<PathBuf> {
        let (stem, suffix) = split_name(source)?;
        let stamp = at.format(TIMESTAMP_FORMAT).to_string();
        let mut candidate = self.dir.join(format!("{stem}_{stamp}{suffix}"));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("{stem}_{stamp}_{n}{suffix}"));
            n += 1;
        }
        Ok(candidate)
    }

    /// Back up `source` and prune older backups of it.
    ///
    /// The backup is re-read and compared against the source by checksum;
    /// on mismatch it is deleted and [`Error::Integrity`] returned, so a
    /// corrupt backup never survives.
    pub fn create_backup(&self, source: &Path) -> Result<BackupRecord> {
        self.create_backup_at(source, Local::now())
    }

    /// [`create_backup`](Self::create_backup) with an explicit timestamp.
    pub fn create_backup_at(&self, source: &Path, at: DateTime<Local>) -> Result<BackupRecord> {
        let record = self.snapshot_at(source, source, at)?;
        self.prune_quietly(source);
        Ok(record)
    }

    /// Back up the content of `source` under the name of `name`, then prune
    /// older backups sharing that name. Used for files fetched into scratch
    /// space, whose own name means nothing.
    pub(crate) fn create_backup_named(&self, source: &Path, name: &Path) -> Result<BackupRecord> {
        let record = self.snapshot_at(source, name, Local::now())?;
        self.prune_quietly(name);
        Ok(record)
    }

    /// Create a verified backup without pruning.
    pub(crate) fn snapshot(&self, source: &Path) -> Result<BackupRecord> {
        self.snapshot_at(source, source, Local::now())
    }

    fn snapshot_at(&self, source: &Path, name: &Path, at: DateTime<Local>) -> Result<BackupRecord> {
        if !source.is_file() {
            return Err(plsync_fs::Error::io(
                source,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file to back up does not exist"),
            )
            .into());
        }
        fs::create_dir_all(&self.dir).map_err(|e| plsync_fs::Error::io(&self.dir, e))?;
        let path = self.unused_path(name, at)?;

        let verified = self
            .copy(source, &path)
            .map_err(Error::from)
            .and_then(|()| {
                let expected = Checksum::of_file(source)?;
                let actual = Checksum::of_file(&path)?;
                if expected == actual {
                    Ok(expected)
                } else {
                    Err(Error::Integrity {
                        path: path.clone(),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    })
                }
            });

        match verified {
            Ok(checksum) => {
                tracing::info!(source = %source.display(), backup = %path.display(), "Created backup");
                Ok(BackupRecord {
                    path,
                    checksum,
                    created: at,
                })
            }
            Err(e) => {
                tracing::error!(source = %source.display(), error = %e, "Backup failed, removing partial copy");
                if let Err(cleanup) = io::remove_if_exists(&path) {
                    tracing::error!(backup = %path.display(), error = %cleanup, "Could not remove partial backup");
                }
                Err(e)
            }
        }
    }

    /// Backups of `playlist`, newest first.
    ///
    /// Only files named `{stem}_{YYYYMMDD}_{HHMMSS}[_n]{suffix}` count, so
    /// `mix` never claims the backups of `mix_party`.
    pub fn list_backups(&self, playlist: &Path) -> Result<Vec<BackupEntry>> {
        let (stem, suffix) = split_name(playlist)?;
        let pattern = format!(
            r"^{}_\d{{8}}_\d{{6}}(_\d+)?{}$",
            regex::escape(&stem),
            regex::escape(&suffix)
        );
        let matcher = Regex::new(&pattern).map_err(|e| Error::InvalidRequest {
            message: format!("cannot match backups of {}: {e}", playlist.display()),
        })?;

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(plsync_fs::Error::io(&self.dir, e).into()),
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| plsync_fs::Error::io(&self.dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !matcher.is_match(&name) {
                continue;
            }
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| plsync_fs::Error::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata
                .modified()
                .map_err(|e| plsync_fs::Error::io(&path, e))?;
            backups.push(BackupEntry {
                path,
                modified: DateTime::<Local>::from(modified),
                size: metadata.len(),
            });
        }

        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
        Ok(backups)
    }

    /// Delete all but the `keep` most recently modified backups of
    /// `playlist`. Returns the deleted paths.
    pub fn cleanup_old_backups(&self, playlist: &Path, keep: usize) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for entry in self.list_backups(playlist)?.into_iter().skip(keep) {
            if io::remove_if_exists(&entry.path)? {
                tracing::debug!(backup = %entry.path.display(), "Pruned old backup");
                removed.push(entry.path);
            }
        }
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), keep, "Pruned old backups");
        }
        Ok(removed)
    }

    pub(crate) fn prune_quietly(&self, playlist: &Path) {
        if let Err(e) = self.cleanup_old_backups(playlist, self.keep) {
            tracing::warn!(error = %e, "Backup pruning failed");
        }
    }

    /// Restore `backup` over `target`.
    ///
    /// The current target is snapshotted first; if the restored content does
    /// not match the backup, the snapshot is put back. Returns the snapshot
    /// of the replaced content, if the target existed.
    ///
    /// Nothing is pruned here, so restoring the oldest retained backup never
    /// deletes it; the next [`create_backup`](Self::create_backup) prunes.
    pub fn restore_backup(&self, backup: &Path, target: &Path) -> Result<Option<BackupRecord>> {
        if !backup.is_file() {
            return Err(Error::BackupNotFound {
                path: backup.to_path_buf(),
            });
        }
        let expected = Checksum::of_file(backup)?;

        let guard = GuardedWrite::begin(self, target)?;
        let snapshot = guard.commit_with(|t| self.copy(backup, t), &expected)?;

        tracing::info!(backup = %backup.display(), target = %target.display(), "Restored backup");
        Ok(snapshot)
    }
}
