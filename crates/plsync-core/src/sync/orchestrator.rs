//! Plan execution

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plsync_fs::{Checksum, LibraryRoot, Manifest, ManifestStyle, NormalizedPath, io};
use plsync_transport::{Transfer, TransportClient, TransportError, shell_quote};
use serde::{Deserialize, Serialize};

use super::plan::{SyncKind, SyncPlan};
use super::rewrite::edit_manifest;
use crate::backup::{BackupManager, BackupRecord, GuardedWrite};
use crate::diff::{normalize_remote, remote_manifest_path};
use crate::progress::{Liveness, Progress, blend, report};
use crate::{Error, Result};

/// Told about every backup created on behalf of a sync, so the path can be
/// shown to the user.
pub trait BackupListener: Send + Sync {
    fn backup_created(&self, record: &BackupRecord);
}

/// One file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncItem {
    pub kind: SyncKind,
    pub path: NormalizedPath,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub completed: Vec<SyncItem>,
    /// Operations with nothing to do, e.g. a missing local source
    pub skipped: Vec<SyncItem>,
    /// Backup of the local playlist taken before any local change
    pub backup: Option<BackupRecord>,
    pub manifest_rewritten: bool,
}

impl SyncReport {
    pub fn completed_count(&self, kind: SyncKind) -> usize {
        self.completed.iter().filter(|item| item.kind == kind).count()
    }
}

/// Applies a [`SyncPlan`] file by file.
///
/// There is no multi-file atomicity: the first failure stops the run and
/// leaves completed transfers in place. Recovery is the pre-operation
/// manifest backup plus a fresh comparison.
pub struct SyncOrchestrator {
    client: TransportClient,
    backups: BackupManager,
    root: LibraryRoot,
    remote_root: LibraryRoot,
    liveness: Liveness,
    listener: Option<Arc<dyn BackupListener>>,
}

impl SyncOrchestrator {
    pub fn new(client: TransportClient, backups: BackupManager, root: LibraryRoot) -> Self {
        let remote_root = LibraryRoot::new(client.remote_root());
        Self {
            client,
            backups,
            root,
            remote_root,
            liveness: Liveness::new(),
            listener: None,
        }
    }

    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn BackupListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Run `plan` against `playlist`.
    ///
    /// Progress is blended across the non-empty sets (and the manifest
    /// rewrite, when requested) into one 0..=100 figure.
    pub async fn sync(
        &self,
        playlist: &Path,
        plan: &SyncPlan,
        progress: Option<&Progress>,
    ) -> Result<SyncReport> {
        plan.validate()?;
        let mut outcome = SyncReport::default();
        if plan.is_empty() {
            tracing::info!(playlist = %playlist.display(), "Nothing to sync");
            report(progress, 100);
            return Ok(outcome);
        }

        if plan.touches_local_files() {
            let record = self.backups.create_backup(playlist).inspect_err(|e| {
                tracing::error!(playlist = %playlist.display(), error = %e, "Backup failed, sync aborted");
            })?;
            if let Some(listener) = &self.listener {
                listener.backup_created(&record);
            }
            outcome.backup = Some(record);
        }

        let operations = plan.operations();
        let total = operations.len() + usize::from(plan.rewrite_manifests);

        for (index, (kind, keys)) in operations.iter().enumerate() {
            tracing::info!(%kind, count = keys.len(), "Starting operation set");
            for (done, key) in keys.iter().enumerate() {
                self.liveness.check()?;

                let item = SyncItem {
                    kind: *kind,
                    path: key.clone(),
                };
                match self.apply(*kind, key).await {
                    Ok(true) => outcome.completed.push(item),
                    Ok(false) => outcome.skipped.push(item),
                    Err(e) => {
                        tracing::error!(
                            %kind,
                            path = %key,
                            completed = outcome.completed.len(),
                            error = %e,
                            "Sync stopped; completed transfers are kept"
                        );
                        return Err(e);
                    }
                }

                let step = ((done + 1) * 100 / keys.len()) as u8;
                report(progress, blend(index, total, step));
                tokio::task::yield_now().await;
            }
        }

        if plan.rewrite_manifests {
            self.liveness.check()?;
            self.rewrite_manifests(playlist, plan, outcome.backup.clone()).await?;
            outcome.manifest_rewritten = true;
        }

        tracing::info!(
            completed = outcome.completed.len(),
            skipped = outcome.skipped.len(),
            "Sync finished"
        );
        report(progress, 100);
        Ok(outcome)
    }

    /// Apply one operation. `Ok(false)` means there was nothing to do.
    async fn apply(&self, kind: SyncKind, key: &NormalizedPath) -> Result<bool> {
        if key.is_absolute() {
            tracing::warn!(%kind, path = %key, "Path is outside the library root, skipped");
            return Ok(false);
        }
        let local = self.root.denormalize(key);
        let remote = key.under_remote_root(self.client.remote_root());

        match kind {
            SyncKind::AddToRemote => {
                if !local.is_file() {
                    tracing::warn!(path = %local.display(), "Local source missing, skipped");
                    return Ok(false);
                }
                self.ensure_remote_parent(&remote).await?;
                self.client.copy_to_remote(&local, &remote).await?;
                Ok(true)
            }
            SyncKind::AddToLocal => {
                if let Some(parent) = local.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| plsync_fs::Error::io(parent, e))?;
                }
                match self.client.copy_from_remote(&remote, &local).await? {
                    Transfer::Completed => Ok(true),
                    Transfer::NotFound => {
                        tracing::warn!(remote = %remote, "Remote source missing, skipped");
                        Ok(false)
                    }
                }
            }
            SyncKind::DeleteFromRemote => {
                self.client.delete_remote_file(&remote).await?;
                Ok(true)
            }
            SyncKind::DeleteFromLocal => {
                let removed = io::remove_if_exists(&local)?;
                if removed {
                    tracing::info!(path = %local.display(), "Deleted local file");
                }
                Ok(removed)
            }
        }
    }

    async fn ensure_remote_parent(&self, remote: &str) -> Result<()> {
        let Some((parent, _)) = remote.rsplit_once('/') else {
            return Ok(());
        };
        if parent.is_empty() {
            return Ok(());
        }
        let output = self
            .client
            .run_command(&format!("mkdir -p {}", shell_quote(parent)))
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(TransportError::CommandFailed {
                code: output.exit_code,
                stderr: output.stderr,
            }
            .into())
        }
    }

    async fn rewrite_manifests(
        &self,
        playlist: &Path,
        plan: &SyncPlan,
        backup: Option<BackupRecord>,
    ) -> Result<()> {
        let add_local: BTreeSet<_> = plan.keys(SyncKind::AddToLocal).cloned().collect();
        let remove_local: BTreeSet<_> = plan.keys(SyncKind::DeleteFromLocal).cloned().collect();
        let mut manifest = Manifest::read(playlist)?;
        if edit_manifest(&mut manifest, |e| self.root.normalize(e), &add_local, &remove_local) {
            let content = manifest.render(ManifestStyle::Local, &self.root);
            let guard = match backup {
                Some(record) => GuardedWrite::with_snapshot(&self.backups, playlist, record),
                None => GuardedWrite::begin(&self.backups, playlist)?,
            };
            guard.write(content.as_bytes())?;
            tracing::info!(playlist = %playlist.display(), entries = manifest.len(), "Local manifest rewritten");
        }

        let add_remote: BTreeSet<_> = plan.keys(SyncKind::AddToRemote).cloned().collect();
        let remove_remote: BTreeSet<_> = plan.keys(SyncKind::DeleteFromRemote).cloned().collect();
        self.rewrite_remote_manifest(playlist, &add_remote, &remove_remote)
            .await
    }

    /// Fetch, edit, upload, re-fetch and compare the remote manifest.
    ///
    /// The fetched original is kept as a backup named after the playlist
    /// (`<stem>_remote_<timestamp>`) before anything is uploaded. On a
    /// mismatch it is put back and verified the same way; when that fails
    /// too the error is [`Error::RollbackFailed`] and names the backup.
    async fn rewrite_remote_manifest(
        &self,
        playlist: &Path,
        add: &BTreeSet<NormalizedPath>,
        remove: &BTreeSet<NormalizedPath>,
    ) -> Result<()> {
        let remote_path = remote_manifest_path(self.client.remote_root(), playlist)?;
        let scratch = tempfile::TempDir::new()?;
        let original = scratch.path().join("original.m3u");

        let existed = match self.client.copy_from_remote(&remote_path, &original).await? {
            Transfer::Completed => true,
            Transfer::NotFound => false,
        };
        let mut manifest = if existed {
            Manifest::read(&original).map_err(|e| Error::RemoteManifestUnreadable {
                path: remote_path.clone(),
                reason: e.to_string(),
            })?
        } else {
            Manifest::default()
        };

        let normalize = |e: &str| normalize_remote(&self.root, &self.remote_root, e);
        if !edit_manifest(&mut manifest, normalize, add, remove) {
            tracing::debug!(remote = %remote_path, "Remote manifest already up to date");
            return Ok(());
        }

        let saved = if existed {
            let record = self
                .backups
                .create_backup_named(&original, &remote_copy_name(playlist))?;
            tracing::info!(remote = %remote_path, backup = %record.path.display(), "Saved remote manifest");
            Some(record)
        } else {
            None
        };

        let updated = scratch.path().join("updated.m3u");
        manifest.write(&updated, ManifestStyle::Remote, &self.root)?;
        self.client.copy_to_remote(&updated, &remote_path).await?;

        let expected = Checksum::of_file(&updated)?;
        let verified = self
            .verify_upload(&remote_path, &expected, &scratch.path().join("verify.m3u"))
            .await;
        let cause = match verified {
            Ok(()) => {
                tracing::info!(remote = %remote_path, entries = manifest.len(), "Remote manifest rewritten");
                return Ok(());
            }
            Err(e) => e,
        };
        tracing::error!(remote = %remote_path, error = %cause, "Remote manifest verification failed, restoring original");

        match self.restore_remote_manifest(&remote_path, saved.as_ref(), scratch.path()).await {
            Ok(()) => {
                tracing::info!(remote = %remote_path, "Remote manifest restored");
                Err(cause)
            }
            Err(e) => {
                let rollback = match &saved {
                    Some(record) => {
                        tracing::error!(
                            remote = %remote_path,
                            backup = %record.path.display(),
                            error = %e,
                            "Remote manifest could not be restored"
                        );
                        format!("{e}; original kept at {}", record.path.display())
                    }
                    None => e.to_string(),
                };
                Err(Error::RollbackFailed {
                    path: PathBuf::from(&remote_path),
                    cause: cause.to_string(),
                    rollback,
                })
            }
        }
    }

    /// Fetch `remote_path` into `scratch_file` and compare it with `expected`.
    async fn verify_upload(&self, remote_path: &str, expected: &Checksum, scratch_file: &Path) -> Result<()> {
        let actual = match self.client.copy_from_remote(remote_path, scratch_file).await? {
            Transfer::Completed => Some(Checksum::of_file(scratch_file)?),
            Transfer::NotFound => None,
        };
        if actual.as_ref() == Some(expected) {
            return Ok(());
        }
        Err(Error::Integrity {
            path: PathBuf::from(remote_path),
            expected: expected.to_string(),
            actual: actual.map_or_else(|| "missing".to_string(), |c| c.to_string()),
        })
    }

    /// Put the saved original back, or remove the upload when there was
    /// none, and check the host agrees.
    async fn restore_remote_manifest(
        &self,
        remote_path: &str,
        saved: Option<&BackupRecord>,
        scratch: &Path,
    ) -> Result<()> {
        match saved {
            Some(record) => {
                self.client.copy_to_remote(&record.path, remote_path).await?;
                self.verify_upload(remote_path, &record.checksum, &scratch.join("restored.m3u"))
                    .await
            }
            None => {
                self.client.delete_remote_file(remote_path).await?;
                if self.client.remote_file_exists(remote_path).await? {
                    Err(Error::Integrity {
                        path: PathBuf::from(remote_path),
                        expected: "missing".to_string(),
                        actual: "present".to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// `mix.m3u` becomes `mix_remote.m3u`, so the remote copy's backups never
/// mix with the local playlist's.
fn remote_copy_name(playlist: &Path) -> PathBuf {
    let stem = playlist
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match playlist.extension() {
        Some(ext) => format!("{stem}_remote.{}", ext.to_string_lossy()),
        None => format!("{stem}_remote"),
    };
    playlist.with_file_name(name)
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("client", &self.client)
            .field("root", &self.root)
            .field("listener", &self.listener.is_some())
            .finish_non_exhaustive()
    }
}
