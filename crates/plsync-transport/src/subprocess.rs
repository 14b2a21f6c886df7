//! Transport backed by an external secure-shell toolchain
//!
//! Every operation spawns one short-lived process through
//! `tokio::process::Command`. Connection tests and copies are bounded by
//! [`Timeouts`]; the child is killed if the limit expires. Generic command
//! execution has no limit.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::credentials::Session;
use crate::error::{Result, TransportError};
use crate::transport::{CommandOutput, Timeouts, Transport};

/// Exit status sshpass uses for a rejected password
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// Exit status ssh uses for its own (non-remote) failures
const SSH_CONNECTION_ERROR: i32 = 255;

const AUTH_PATTERNS: &[&str] = &[
    "permission denied",
    "access denied",
    "authentication failed",
    "incorrect password",
    "too many authentication failures",
    "password was not accepted",
];

/// ssh lists the offered methods after its own refusal, e.g.
/// `pi@host: Permission denied (publickey,password).`
const SSH_LOGIN_REFUSED: &str = "permission denied (";

/// Prefix of plink/pscp's own fatal messages
const PUTTY_FATAL: &str = "fatal error:";

const NOT_FOUND_PATTERNS: &[&str] = &["no such file", "not found"];

const UNREACHABLE_PATTERNS: &[&str] = &[
    "connection refused",
    "connection timed out",
    "timed out",
    "could not resolve",
    "no route to host",
    "network error",
    "network is unreachable",
];

/// Which external binaries to drive.
///
/// Copies always run in SFTP mode (`scp -s`, `pscp -sftp`), where a remote
/// path reaches the server verbatim instead of through a remote shell, so
/// paths with spaces or quotes are passed unquoted. OpenSSH older than 8.7
/// has no `-s` and is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toolchain {
    /// `ssh` and `scp`, with `sshpass` supplying a password when one is set
    #[default]
    OpenSsh,
    /// `plink` and `pscp`
    Putty,
}

impl Toolchain {
    fn shell_program(self) -> &'static str {
        match self {
            Self::OpenSsh => "ssh",
            Self::Putty => "plink",
        }
    }

    fn copy_program(self) -> &'static str {
        match self {
            Self::OpenSsh => "scp",
            Self::Putty => "pscp",
        }
    }
}

fn mentions_any(lower: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| lower.contains(p))
}

/// Quote a string as a single argument for a POSIX remote shell.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// What a failed process was doing, which decides whose words its stderr
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase<'a> {
    /// `echo ok`: only the toolchain can complain
    Connect,
    /// A copy touching this remote path
    Copy(&'a str),
    /// A remote command, whose own stderr may mention permissions
    Command,
}

/// A fully prepared process launch.
struct Invocation {
    program: String,
    args: Vec<String>,
    /// Value for `SSHPASS`; the program is `sshpass` when set
    sshpass: Option<String>,
    /// Secret to mask when logging the command line
    redact: Option<String>,
}

impl Invocation {
    fn display(&self) -> String {
        let line = format!("{} {}", self.program, self.args.join(" "));
        match &self.redact {
            Some(secret) if !secret.is_empty() => line.replace(secret.as_str(), "***"),
            _ => line,
        }
    }
}

/// [`Transport`] implementation that shells out to `ssh`/`scp` or
/// `plink`/`pscp`.
#[derive(Debug)]
pub struct SshTransport {
    session: Arc<Session>,
    toolchain: Toolchain,
    timeouts: Timeouts,
    host_key_primed: AtomicBool,
}

impl SshTransport {
    pub fn new(session: Arc<Session>, toolchain: Toolchain) -> Self {
        Self {
            session,
            toolchain,
            timeouts: Timeouts::default(),
            host_key_primed: AtomicBool::new(false),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn toolchain(&self) -> Toolchain {
        self.toolchain
    }

    /// Common leading arguments for either program of the toolchain.
    fn base_args(&self, copy: bool, secret: Option<&str>) -> Vec<String> {
        let port = self.session.credentials().port.to_string();
        let mut args = Vec::new();
        match self.toolchain {
            Toolchain::OpenSsh => {
                args.push(if copy { "-P" } else { "-p" }.to_string());
                args.push(port);
                if copy {
                    args.push("-s".to_string());
                }
                args.push("-o".to_string());
                args.push(format!(
                    "ConnectTimeout={}",
                    self.timeouts.connect.as_secs().max(1)
                ));
                args.push("-o".to_string());
                args.push("StrictHostKeyChecking=accept-new".to_string());
                if secret.is_none() {
                    args.push("-o".to_string());
                    args.push("BatchMode=yes".to_string());
                }
            }
            Toolchain::Putty => {
                args.push("-P".to_string());
                args.push(port);
                args.push("-batch".to_string());
                if copy {
                    args.push("-sftp".to_string());
                }
                if let Some(secret) = secret {
                    args.push("-pw".to_string());
                    args.push(secret.to_string());
                }
            }
        }
        args
    }

    fn wrap(&self, program: &str, args: Vec<String>, secret: Option<String>) -> Invocation {
        match (self.toolchain, secret) {
            (Toolchain::OpenSsh, Some(secret)) => {
                let mut wrapped = vec!["-e".to_string(), program.to_string()];
                wrapped.extend(args);
                Invocation {
                    program: "sshpass".to_string(),
                    args: wrapped,
                    sshpass: Some(secret),
                    redact: None,
                }
            }
            (_, secret) => Invocation {
                program: program.to_string(),
                args,
                sshpass: None,
                redact: secret,
            },
        }
    }

    fn shell_invocation(&self, command: &str) -> Invocation {
        let secret = self.session.secret();
        let mut args = self.base_args(false, secret.as_deref());
        args.push(self.session.credentials().destination());
        args.push(command.to_string());
        self.wrap(self.toolchain.shell_program(), args, secret)
    }

    fn copy_invocation(&self, source: String, dest: String) -> Invocation {
        let secret = self.session.secret();
        let mut args = self.base_args(true, secret.as_deref());
        args.push(source);
        args.push(dest);
        self.wrap(self.toolchain.copy_program(), args, secret)
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        operation: &str,
        limit: Option<Duration>,
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(secret) = &invocation.sshpass {
            cmd.env("SSHPASS", secret);
        }

        tracing::debug!(operation, command = %invocation.display(), "Spawning transport process");

        let spawn_error = |source| TransportError::Spawn {
            program: invocation.program.clone(),
            source,
        };
        let mut child = cmd.spawn().map_err(spawn_error)?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // The child may exit before reading; a broken pipe is not fatal.
            if let Err(e) = pipe.write_all(input).await {
                tracing::debug!(operation, error = %e, "Could not write to child stdin");
            }
        }

        let waited = child.wait_with_output();
        let output = match limit {
            Some(limit) => tokio::time::timeout(limit, waited).await.map_err(|_| {
                tracing::warn!(operation, seconds = limit.as_secs(), "Transport process timed out");
                TransportError::Timeout {
                    operation: operation.to_string(),
                    seconds: limit.as_secs(),
                }
            })?,
            None => waited.await,
        }
        .map_err(spawn_error)?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(operation, exit_code = result.exit_code, "Transport process finished");
        Ok(result)
    }

    /// Turn a failed process into a typed error.
    ///
    /// Outside the connection test, only the toolchain's own refusal
    /// counts as a login failure; a remote `Permission denied` from `rm` or
    /// a copy is a plain command failure.
    fn classify(&self, output: &CommandOutput, invocation: &Invocation, phase: Phase<'_>) -> TransportError {
        let creds = self.session.credentials();
        let stderr = output.stderr.trim().to_string();
        let lower = stderr.to_lowercase();

        let sshpass_rejected =
            invocation.sshpass.is_some() && output.exit_code == SSHPASS_BAD_PASSWORD;
        let login_refused = match phase {
            Phase::Connect => mentions_any(&lower, AUTH_PATTERNS),
            Phase::Copy(_) | Phase::Command => self.toolchain_refused_login(output.exit_code, &lower),
        };
        if sshpass_rejected || login_refused {
            return TransportError::AuthFailed {
                user: creds.username.clone(),
                host: creds.host.clone(),
                message: if stderr.is_empty() {
                    "password rejected".to_string()
                } else {
                    stderr
                },
            };
        }

        if let Phase::Copy(path) = phase {
            if mentions_any(&lower, NOT_FOUND_PATTERNS) {
                return TransportError::NotFound {
                    path: path.to_string(),
                };
            }
        }

        let ssh_failed = self.toolchain == Toolchain::OpenSsh
            && !matches!(phase, Phase::Copy(_))
            && output.exit_code == SSH_CONNECTION_ERROR;
        if ssh_failed || mentions_any(&lower, UNREACHABLE_PATTERNS) {
            return TransportError::Unreachable {
                host: creds.host.clone(),
                message: stderr,
            };
        }

        TransportError::CommandFailed {
            code: output.exit_code,
            stderr,
        }
    }

    /// Whether ssh or plink itself, not the remote side, rejected the login.
    fn toolchain_refused_login(&self, exit_code: i32, lower: &str) -> bool {
        match self.toolchain {
            Toolchain::OpenSsh => {
                lower.contains(SSH_LOGIN_REFUSED)
                    || (exit_code == SSH_CONNECTION_ERROR && mentions_any(lower, AUTH_PATTERNS))
            }
            Toolchain::Putty => lower.lines().map(str::trim).any(|line| {
                line == "access denied"
                    || (line.starts_with(PUTTY_FATAL) && mentions_any(line, AUTH_PATTERNS))
            }),
        }
    }

    /// Accept the host key once so later `-batch` runs do not stall on it.
    ///
    /// Only PuTTY needs this; OpenSSH uses `StrictHostKeyChecking=accept-new`.
    async fn prime_host_key(&self) {
        if self.toolchain != Toolchain::Putty || self.host_key_primed.load(Ordering::SeqCst) {
            return;
        }
        let Some(secret) = self.session.secret() else {
            return;
        };

        let creds = self.session.credentials();
        let invocation = Invocation {
            program: "plink".to_string(),
            args: vec![
                "-P".to_string(),
                creds.port.to_string(),
                "-pw".to_string(),
                secret.clone(),
                creds.destination(),
                "exit".to_string(),
            ],
            sshpass: None,
            redact: Some(secret),
        };
        match self
            .execute(&invocation, "host key priming", Some(self.timeouts.connect), Some(b"y\n"))
            .await
        {
            Ok(_) => self.host_key_primed.store(true, Ordering::SeqCst),
            Err(e) => tracing::debug!(error = %e, "Host key priming failed"),
        }
    }

    async fn copy(&self, source: String, dest: String, remote: &str, operation: &str) -> Result<()> {
        let invocation = self.copy_invocation(source, dest);
        let output = self
            .execute(&invocation, operation, Some(self.timeouts.transfer), None)
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(self.classify(&output, &invocation, Phase::Copy(remote)))
        }
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn test(&self) -> Result<()> {
        self.prime_host_key().await;
        let invocation = self.shell_invocation("echo ok");
        let output = self
            .execute(&invocation, "connection test", Some(self.timeouts.connect), None)
            .await?;
        if output.success() {
            Ok(())
        } else {
            Err(self.classify(&output, &invocation, Phase::Connect))
        }
    }

    async fn copy_in(&self, remote: &str, local: &Path) -> Result<()> {
        let source = self.session.credentials().remote_spec(remote);
        let dest = local.to_string_lossy().into_owned();
        self.copy(source, dest, remote, "copy from remote").await
    }

    async fn copy_out(&self, local: &Path, remote: &str) -> Result<()> {
        if !local.is_file() {
            return Err(TransportError::io(
                local,
                std::io::Error::new(std::io::ErrorKind::NotFound, "local source missing"),
            ));
        }
        let source = local.to_string_lossy().into_owned();
        let dest = self.session.credentials().remote_spec(remote);
        self.copy(source, dest, remote, "copy to remote").await
    }

    async fn remove(&self, remote: &str) -> Result<()> {
        let output = self.run(&format!("rm -- {}", shell_quote(remote))).await?;
        if output.success() {
            Ok(())
        } else {
            Err(TransportError::CommandFailed {
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        let invocation = self.shell_invocation(command);
        let output = self.execute(&invocation, "remote command", None, None).await?;
        if output.success() {
            return Ok(output);
        }
        // Auth and connection failures are errors; anything else is the
        // remote command's own exit status.
        match self.classify(&output, &invocation, Phase::Command) {
            err if err.is_connection() => Err(err),
            _ => Ok(output),
        }
    }
}
