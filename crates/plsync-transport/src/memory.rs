//! In-memory transport with failure injection
//!
//! Remote files live in a map keyed by their POSIX remote path. Only the
//! handful of shell commands the sync layer issues are understood by
//! [`Transport::run`]: `echo`, `test -f`, `test -d`, `mkdir -p` and `rm`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::credentials::Session;
use crate::error::{Result, TransportError};
use crate::transport::{CommandOutput, Transport};

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    unreachable: bool,
    failing_copies: BTreeSet<String>,
    /// Remaining corrupted uploads per path; `None` means every one
    corrupt_uploads: BTreeMap<String, Option<usize>>,
    unreadable_downloads: BTreeSet<String>,
    calls: Vec<String>,
}

/// A fake remote host held entirely in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    host: String,
    state: Mutex<State>,
    /// Session to check, and the secret it must hold
    auth: Option<(Arc<Session>, String)>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            host: "memory".to_string(),
            state: Mutex::new(State::default()),
            auth: None,
        }
    }

    /// Reject every call unless `session` holds `secret`.
    pub fn require_secret(mut self, session: Arc<Session>, secret: impl Into<String>) -> Self {
        self.host = session.credentials().host.clone();
        self.auth = Some((session, secret.into()));
        self
    }

    pub fn with_file(self, remote: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert_file(remote, content);
        self
    }

    pub fn with_dir(self, remote: impl Into<String>) -> Self {
        self.lock().dirs.insert(trim_dir(&remote.into()));
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_file(&self, remote: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.lock().files.insert(remote.into(), content.into());
    }

    pub fn file(&self, remote: &str) -> Option<Vec<u8>> {
        self.lock().files.get(remote).cloned()
    }

    pub fn contains(&self, remote: &str) -> bool {
        self.lock().files.contains_key(remote)
    }

    /// All remote file paths, sorted.
    pub fn files(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// Make every call fail as if the host were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Make any copy touching `remote` fail with a non-zero exit.
    pub fn fail_copies_of(&self, remote: impl Into<String>) {
        self.lock().failing_copies.insert(remote.into());
    }

    /// Store uploads to `remote` with altered content, as a flaky link would.
    pub fn corrupt_uploads_to(&self, remote: impl Into<String>) {
        self.lock().corrupt_uploads.insert(remote.into(), None);
    }

    /// Corrupt only the next `count` uploads to `remote`.
    pub fn corrupt_next_uploads_to(&self, remote: impl Into<String>, count: usize) {
        self.lock().corrupt_uploads.insert(remote.into(), Some(count));
    }

    /// Report downloads of `remote` as successful while leaving a directory
    /// where the file should be, so reading the copy fails.
    pub fn unreadable_downloads_of(&self, remote: impl Into<String>) {
        self.lock().unreadable_downloads.insert(remote.into());
    }

    /// Operations performed so far, in order, e.g. `copy_out /r/a.mp3`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn enter(&self, call: String) -> Result<MutexGuard<'_, State>> {
        if let Some((session, expected)) = &self.auth {
            if session.secret().as_deref() != Some(expected.as_str()) {
                return Err(TransportError::AuthFailed {
                    user: session.credentials().username.clone(),
                    host: self.host.clone(),
                    message: "Permission denied".to_string(),
                });
            }
        }
        let mut state = self.lock();
        if state.unreachable {
            return Err(TransportError::Unreachable {
                host: self.host.clone(),
                message: "Connection refused".to_string(),
            });
        }
        state.calls.push(call);
        Ok(state)
    }
}

fn trim_dir(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn simulated_failure(remote: &str) -> TransportError {
    TransportError::CommandFailed {
        code: 1,
        stderr: format!("simulated transfer failure for {remote}"),
    }
}

/// Split a command line on whitespace, honoring single quotes and the
/// `'\''` escape produced by `shell_quote`.
fn split_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                quoted = !quoted;
                in_word = true;
            }
            '\\' if !quoted => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

fn exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        exit_code: code,
        stdout: stdout.into(),
        stderr: stderr.into(),
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn test(&self) -> Result<()> {
        self.enter("test".to_string()).map(|_| ())
    }

    async fn copy_in(&self, remote: &str, local: &Path) -> Result<()> {
        let content = {
            let state = self.enter(format!("copy_in {remote}"))?;
            if state.failing_copies.contains(remote) {
                return Err(simulated_failure(remote));
            }
            let content = state
                .files
                .get(remote)
                .cloned()
                .ok_or_else(|| TransportError::NotFound {
                    path: remote.to_string(),
                })?;
            (!state.unreadable_downloads.contains(remote)).then_some(content)
        };
        let written = match content {
            Some(content) => tokio::fs::write(local, content).await,
            None => tokio::fs::create_dir_all(local).await,
        };
        written.map_err(|e| TransportError::io(local, e))
    }

    async fn copy_out(&self, local: &Path, remote: &str) -> Result<()> {
        drop(self.enter(format!("copy_out {remote}"))?);
        let mut content = tokio::fs::read(local)
            .await
            .map_err(|e| TransportError::io(local, e))?;

        let mut state = self.lock();
        if state.failing_copies.contains(remote) {
            return Err(simulated_failure(remote));
        }
        let corrupt = match state.corrupt_uploads.get_mut(remote) {
            Some(None) => true,
            Some(Some(0)) | None => false,
            Some(Some(remaining)) => {
                *remaining -= 1;
                true
            }
        };
        if corrupt {
            content.extend_from_slice(b"\ncorrupted-entry.mp3\n");
        }
        state.files.insert(remote.to_string(), content);
        Ok(())
    }

    async fn remove(&self, remote: &str) -> Result<()> {
        let mut state = self.enter(format!("remove {remote}"))?;
        match state.files.remove(remote) {
            Some(_) => Ok(()),
            None => Err(TransportError::CommandFailed {
                code: 1,
                stderr: format!("rm: cannot remove '{remote}': No such file or directory"),
            }),
        }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let mut state = self.enter(format!("run {command}"))?;
        let words = split_words(command);
        let args: Vec<&str> = words.iter().map(String::as_str).collect();

        let output = match args.as_slice() {
            ["echo", rest @ ..] => exit(0, format!("{}\n", rest.join(" ")), ""),
            ["test", "-f", path] => exit(if state.files.contains_key(*path) { 0 } else { 1 }, "", ""),
            ["test", "-d", path] => {
                let dir = trim_dir(path);
                let prefix = format!("{}/", dir.trim_end_matches('/'));
                let found = state.dirs.contains(&dir)
                    || state.files.keys().any(|f| f.starts_with(&prefix));
                exit(if found { 0 } else { 1 }, "", "")
            }
            ["mkdir", "-p", path] => {
                state.dirs.insert(trim_dir(path));
                exit(0, "", "")
            }
            ["rm", "--", path] | ["rm", path] => match state.files.remove(*path) {
                Some(_) => exit(0, "", ""),
                None => exit(
                    1,
                    "",
                    format!("rm: cannot remove '{path}': No such file or directory\n"),
                ),
            },
            _ => exit(127, "", format!("sh: {command}: command not found\n")),
        };
        Ok(output)
    }
}
