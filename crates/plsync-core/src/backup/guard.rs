//! Two-phase guarded write: snapshot, attempt, verify, commit or roll back

use std::path::{Path, PathBuf};

use plsync_fs::{Checksum, io};

use super::manager::{BackupManager, BackupRecord};
use crate::{Error, Result};

/// A pending overwrite of one file, protected by a verified snapshot.
///
/// Created with [`begin`](Self::begin) (which snapshots the target) or
/// [`with_snapshot`](Self::with_snapshot) (which reuses a backup taken
/// earlier). Consumed by [`write`](Self::write) or
/// [`commit_with`](Self::commit_with): if the attempt fails or the result
/// does not match the expected checksum, the snapshot is copied back. A
/// rollback that itself fails is reported as [`Error::RollbackFailed`].
#[derive(Debug)]
pub struct GuardedWrite<'a> {
    backups: &'a BackupManager,
    target: PathBuf,
    /// `None` when the target did not exist; rollback then removes it
    snapshot: Option<BackupRecord>,
}

impl<'a> GuardedWrite<'a> {
    /// Snapshot `target` (if it exists) before any change is attempted.
    pub fn begin(backups: &'a BackupManager, target: &Path) -> Result<Self> {
        let snapshot = if target.exists() {
            Some(backups.snapshot(target)?)
        } else {
            None
        };
        Ok(Self {
            backups,
            target: target.to_path_buf(),
            snapshot,
        })
    }

    /// Guard `target` with a backup that was already taken and verified.
    pub fn with_snapshot(backups: &'a BackupManager, target: &Path, snapshot: BackupRecord) -> Self {
        Self {
            backups,
            target: target.to_path_buf(),
            snapshot: Some(snapshot),
        }
    }

    pub fn snapshot(&self) -> Option<&BackupRecord> {
        self.snapshot.as_ref()
    }

    /// Write `content` with the manager's writer and verify it by checksum.
    pub fn write(self, content: &[u8]) -> Result<Option<BackupRecord>> {
        let expected = Checksum::of_bytes(content);
        let backups = self.backups;
        self.commit_with(|target| backups.write(target, content), &expected)
    }

    /// Run `attempt` against the target and require the result to hash to
    /// `expected`. Returns the snapshot on success.
    pub fn commit_with<F>(self, attempt: F, expected: &Checksum) -> Result<Option<BackupRecord>>
    where
        F: FnOnce(&Path) -> plsync_fs::Result<()>,
    {
        let failure = match attempt(&self.target) {
            Err(e) => Error::from(e),
            Ok(()) => match Checksum::of_file(&self.target) {
                Ok(actual) if &actual == expected => {
                    tracing::debug!(target = %self.target.display(), "Guarded write committed");
                    return Ok(self.snapshot);
                }
                Ok(actual) => Error::Integrity {
                    path: self.target.clone(),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                },
                Err(e) => Error::from(e),
            },
        };

        tracing::warn!(target = %self.target.display(), error = %failure, "Guarded write failed, rolling back");
        self.rollback(&failure)?;
        Err(failure)
    }

    fn rollback(&self, cause: &Error) -> Result<()> {
        let outcome = match &self.snapshot {
            Some(snapshot) => self
                .backups
                .copy(&snapshot.path, &self.target)
                .map_err(Error::from)
                .and_then(|()| {
                    let actual = Checksum::of_file(&self.target)?;
                    if actual == snapshot.checksum {
                        Ok(())
                    } else {
                        Err(Error::Integrity {
                            path: self.target.clone(),
                            expected: snapshot.checksum.to_string(),
                            actual: actual.to_string(),
                        })
                    }
                }),
            None => io::remove_if_exists(&self.target)
                .map(|_| ())
                .map_err(Error::from),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(target = %self.target.display(), "Rolled back to snapshot");
                Ok(())
            }
            Err(e) => {
                tracing::error!(target = %self.target.display(), error = %e, "Rollback failed");
                Err(Error::RollbackFailed {
                    path: self.target.clone(),
                    cause: cause.to_string(),
                    rollback: e.to_string(),
                })
            }
        }
    }
}
