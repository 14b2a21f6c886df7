//! Top-level entry point owning the session and transport

use std::path::{Path, PathBuf};
use std::sync::Arc;

use plsync_transport::{SecretPrompt, Session, SshTransport, Transport, TransportClient};

use crate::backup::{BackupEntry, BackupManager, BackupRecord};
use crate::config::SyncConfig;
use crate::diff::{ComparisonResult, DiffEngine};
use crate::progress::{Liveness, Progress};
use crate::sync::{BackupListener, SyncOrchestrator, SyncPlan, SyncReport};
use crate::Result;

/// Owns the configuration, the shared [`Session`] and the [`Transport`];
/// builds the diff, sync and backup components on demand so they all share
/// one cached secret and one liveness flag.
pub struct SyncController {
    config: SyncConfig,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    liveness: Liveness,
    listener: Option<Arc<dyn BackupListener>>,
}

impl SyncController {
    /// Controller talking to the configured host through the external
    /// secure-shell toolchain.
    pub fn new(config: SyncConfig) -> Self {
        let session = Arc::new(Session::new(config.credentials()));
        let transport = SshTransport::new(session.clone(), config.remote.flavor)
            .with_timeouts(config.remote.timeouts);
        Self::with_transport(config, session, Arc::new(transport))
    }

    /// Controller over an explicit transport, e.g. an in-memory one.
    pub fn with_transport(
        config: SyncConfig,
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            session,
            transport,
            liveness: Liveness::new(),
            listener: None,
        }
    }

    pub fn with_backup_listener(mut self, listener: Arc<dyn BackupListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Clearing this flag stops running work at its next checkpoint.
    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    /// Stop the analysis or sync in flight. Each new [`analyze`] or
    /// [`sync`] re-arms the flag, so a cancel never outlives its call.
    ///
    /// [`analyze`]: Self::analyze
    /// [`sync`]: Self::sync
    pub fn cancel(&self) {
        self.liveness.cancel();
    }

    pub fn client(&self) -> TransportClient {
        TransportClient::new(self.transport.clone(), self.session.clone())
            .with_max_auth_attempts(self.config.remote.max_auth_attempts)
    }

    pub fn diff_engine(&self) -> DiffEngine {
        DiffEngine::new(self.client(), self.config.library_root().clone())
            .with_extensions(self.config.library.extensions.clone())
            .with_liveness(self.liveness.clone())
    }

    /// Backups for `playlist`, in the configured backup directory.
    pub fn backup_manager(&self, playlist: &Path) -> BackupManager {
        BackupManager::new(self.config.backup_dir_for(playlist)).with_keep(self.config.backup.keep)
    }

    pub fn orchestrator(&self, playlist: &Path) -> SyncOrchestrator {
        let orchestrator = SyncOrchestrator::new(
            self.client(),
            self.backup_manager(playlist),
            self.config.library_root().clone(),
        )
        .with_liveness(self.liveness.clone());
        match &self.listener {
            Some(listener) => orchestrator.with_listener(listener.clone()),
            None => orchestrator,
        }
    }

    /// Test the connection, prompting for a secret on authentication
    /// failure up to the configured number of attempts.
    pub async fn connect(&self, prompt: &dyn SecretPrompt) -> Result<()> {
        Ok(self.client().connect(prompt).await?)
    }

    /// Whether the remote library root exists.
    pub async fn check_remote_root(&self) -> Result<bool> {
        Ok(self.client().verify_remote_path().await?)
    }

    pub async fn analyze(
        &self,
        playlist: &Path,
        progress: Option<&Progress>,
    ) -> Result<ComparisonResult> {
        self.liveness.rearm();
        self.diff_engine().compare(playlist, progress).await
    }

    pub async fn sync(
        &self,
        playlist: &Path,
        plan: &SyncPlan,
        progress: Option<&Progress>,
    ) -> Result<SyncReport> {
        self.liveness.rearm();
        self.orchestrator(playlist).sync(playlist, plan, progress).await
    }

    pub fn list_backups(&self, playlist: &Path) -> Result<Vec<BackupEntry>> {
        self.backup_manager(playlist).list_backups(playlist)
    }

    /// Restore `backup` over `playlist`.
    pub fn restore_backup(&self, backup: &Path, playlist: &Path) -> Result<Option<BackupRecord>> {
        self.backup_manager(playlist).restore_backup(backup, playlist)
    }

    /// Prune `playlist`'s backups to `keep` (the configured count when `None`).
    pub fn cleanup_backups(&self, playlist: &Path, keep: Option<usize>) -> Result<Vec<PathBuf>> {
        let keep = keep.unwrap_or(self.config.backup.keep);
        self.backup_manager(playlist).cleanup_old_backups(playlist, keep)
    }
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("liveness", &self.liveness)
            .finish_non_exhaustive()
    }
}
