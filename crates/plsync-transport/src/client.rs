//! High-level client over a [`Transport`]

use std::path::Path;
use std::sync::Arc;

use crate::credentials::{Credentials, SecretPrompt, Session};
use crate::error::{Result, TransportError};
use crate::subprocess::shell_quote;
use crate::transport::{CommandOutput, Transport};

/// Outcome of a copy from the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Completed,
    /// The remote file does not exist; nothing was copied
    NotFound,
}

/// Structured access to one remote host.
///
/// Wraps a shared [`Transport`] and [`Session`]. Any authentication failure
/// seen by any call clears the cached secret; nothing else does.
#[derive(Clone)]
pub struct TransportClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    max_auth_attempts: u32,
}

impl TransportClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<Session>) -> Self {
        Self {
            transport,
            session,
            max_auth_attempts: 3,
        }
    }

    pub fn with_max_auth_attempts(mut self, attempts: u32) -> Self {
        self.max_auth_attempts = attempts.max(1);
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn credentials(&self) -> &Credentials {
        self.session.credentials()
    }

    pub fn remote_root(&self) -> &str {
        &self.session.credentials().remote_root
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_auth() {
                self.session.invalidate();
            }
        }
        result
    }

    /// Run the trivial echo test.
    ///
    /// The cached secret is dropped on an authentication failure when
    /// `invalidate_on_fail` is set; timeouts and unreachable hosts leave it.
    pub async fn test_connection(&self, invalidate_on_fail: bool) -> Result<()> {
        match self.transport.test().await {
            Ok(()) => {
                self.session.mark_verified();
                tracing::info!(host = %self.credentials().host, "Connection test succeeded");
                Ok(())
            }
            Err(e) => {
                match &e {
                    TransportError::Timeout { .. } => {
                        tracing::warn!(error = %e, "Connection test timed out")
                    }
                    TransportError::AuthFailed { .. } => {
                        tracing::warn!(error = %e, "Authentication failed");
                        if invalidate_on_fail {
                            self.session.invalidate();
                        }
                    }
                    _ => tracing::warn!(error = %e, "Connection test failed"),
                }
                Err(e)
            }
        }
    }

    /// Establish a working login, asking `prompt` for a new secret after
    /// each authentication failure, up to the configured attempt count.
    pub async fn connect(&self, prompt: &dyn SecretPrompt) -> Result<()> {
        let mut reason = match self.test_connection(true).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_auth() => e.to_string(),
            Err(e) => return Err(e),
        };

        let mut last_error = None;
        for attempt in 1..=self.max_auth_attempts {
            let Some(secret) = prompt.prompt(self.credentials(), attempt, &reason) else {
                tracing::info!(attempt, "Login abandoned at prompt");
                break;
            };
            self.session.renew(secret);
            match self.test_connection(true).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_auth() => {
                    reason = e.to_string();
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        let creds = self.credentials();
        Err(last_error.unwrap_or_else(|| TransportError::AuthFailed {
            user: creds.username.clone(),
            host: creds.host.clone(),
            message: "no secret provided".to_string(),
        }))
    }

    /// Whether the configured remote library root is an existing directory.
    pub async fn verify_remote_path(&self) -> Result<bool> {
        let command = format!("test -d {}", shell_quote(self.remote_root()));
        let output = self.run_command(&command).await?;
        if !output.success() {
            tracing::warn!(root = %self.remote_root(), "Remote library root not found");
        }
        Ok(output.success())
    }

    pub async fn remote_file_exists(&self, remote: &str) -> Result<bool> {
        let output = self
            .run_command(&format!("test -f {}", shell_quote(remote)))
            .await?;
        Ok(output.success())
    }

    /// Copy a remote file to `local`. A missing remote file is a normal
    /// outcome, reported as [`Transfer::NotFound`].
    pub async fn copy_from_remote(&self, remote: &str, local: &Path) -> Result<Transfer> {
        match self.observe(self.transport.copy_in(remote, local).await) {
            Ok(()) => {
                tracing::debug!(remote, local = %local.display(), "Copied from remote");
                Ok(Transfer::Completed)
            }
            Err(TransportError::NotFound { .. }) => {
                tracing::debug!(remote, "Remote file not found");
                Ok(Transfer::NotFound)
            }
            Err(e) => {
                tracing::warn!(remote, error = %e, "Copy from remote failed");
                Err(e)
            }
        }
    }

    pub async fn copy_to_remote(&self, local: &Path, remote: &str) -> Result<()> {
        let result = self.observe(self.transport.copy_out(local, remote).await);
        match &result {
            Ok(()) => tracing::debug!(local = %local.display(), remote, "Copied to remote"),
            Err(e) => tracing::warn!(remote, error = %e, "Copy to remote failed"),
        }
        result
    }

    /// Run a remote shell command; a non-zero exit is data, not an error.
    pub async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        self.observe(self.transport.run(command).await)
    }

    /// Remove a remote file, failing on a non-zero exit.
    pub async fn delete_remote_file(&self, remote: &str) -> Result<()> {
        let result = self.observe(self.transport.remove(remote).await);
        match &result {
            Ok(()) => tracing::info!(remote, "Deleted remote file"),
            Err(e) => tracing::warn!(remote, error = %e, "Remote delete failed"),
        }
        result
    }
}

impl std::fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("session", &self.session)
            .field("max_auth_attempts", &self.max_auth_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryTransport;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Hands out queued secrets and records every prompt.
    struct ScriptedPrompt {
        answers: Mutex<Vec<String>>,
        asked: Mutex<Vec<u32>>,
    }

    impl ScriptedPrompt {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().rev().map(|s| s.to_string()).collect()),
                asked: Mutex::new(Vec::new()),
            }
        }
    }

    impl SecretPrompt for ScriptedPrompt {
        fn prompt(&self, _: &Credentials, attempt: u32, _: &str) -> Option<String> {
            self.asked.lock().unwrap().push(attempt);
            self.answers.lock().unwrap().pop()
        }
    }

    fn setup(secret: Option<&str>) -> (Arc<Session>, Arc<MemoryTransport>, TransportClient) {
        let creds = Credentials::new("nas", "pi", "/media/Music");
        let session = Arc::new(match secret {
            Some(s) => Session::with_secret(creds, s),
            None => Session::new(creds),
        });
        let transport = Arc::new(
            MemoryTransport::new()
                .require_secret(session.clone(), "right")
                .with_dir("/media/Music"),
        );
        let client = TransportClient::new(transport.clone(), session.clone());
        (session, transport, client)
    }

    #[tokio::test]
    async fn test_connection_invalidates_only_on_auth_failure() {
        let (session, transport, client) = setup(Some("right"));
        transport.set_unreachable(true);
        assert!(client.test_connection(true).await.is_err());
        assert!(session.has_secret());

        transport.set_unreachable(false);
        session.renew("wrong");
        let err = client.test_connection(true).await.unwrap_err();
        assert!(err.is_auth());
        assert!(!session.has_secret());
    }

    #[tokio::test]
    async fn test_connection_keeps_secret_when_asked() {
        let (session, _, client) = setup(Some("wrong"));
        assert!(client.test_connection(false).await.is_err());
        assert!(session.has_secret());
    }

    #[tokio::test]
    async fn test_connect_retries_until_accepted() {
        let (session, _, client) = setup(None);
        let prompt = ScriptedPrompt::new(&["nope", "right"]);

        client.connect(&prompt).await.unwrap();
        assert_eq!(*prompt.asked.lock().unwrap(), vec![1, 2]);
        assert!(session.is_verified());
    }

    #[tokio::test]
    async fn test_connect_gives_up_after_max_attempts() {
        let (session, _, client) = setup(None);
        let client = client.with_max_auth_attempts(2);
        let prompt = ScriptedPrompt::new(&["a", "b", "c"]);

        let err = client.connect(&prompt).await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(*prompt.asked.lock().unwrap(), vec![1, 2]);
        assert!(!session.has_secret());
    }

    #[tokio::test]
    async fn test_connect_does_not_prompt_with_valid_secret() {
        let (_, _, client) = setup(Some("right"));
        let prompt = ScriptedPrompt::new(&[]);
        client.connect(&prompt).await.unwrap();
        assert!(prompt.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_remote_file_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let (_, _, client) = setup(Some("right"));
        let outcome = client
            .copy_from_remote("/media/Music/absent.m3u", &temp.path().join("a.m3u"))
            .await
            .unwrap();
        assert_eq!(outcome, Transfer::NotFound);
    }

    #[tokio::test]
    async fn test_existence_checks() {
        let (_, transport, client) = setup(Some("right"));
        transport.insert_file("/media/Music/mix.m3u", "x");

        assert!(client.verify_remote_path().await.unwrap());
        assert!(client.remote_file_exists("/media/Music/mix.m3u").await.unwrap());
        assert!(!client.remote_file_exists("/media/Music/other.m3u").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_remote_file_fails_on_missing_file() {
        let (_, transport, client) = setup(Some("right"));
        transport.insert_file("/media/Music/a.mp3", "x");

        client.delete_remote_file("/media/Music/a.mp3").await.unwrap();
        let err = client
            .delete_remote_file("/media/Music/a.mp3")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::CommandFailed { .. }));
    }
}
