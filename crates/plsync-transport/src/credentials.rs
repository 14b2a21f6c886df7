//! Credentials and the shared authentication session
//!
//! The session is the one piece of mutable state shared by every transport
//! call: the cached secret. It is populated on the first successful login,
//! cleared only when the host rejects it, and otherwise lives as long as the
//! owning controller.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub username: String,
    pub port: u16,
    /// POSIX path of the library root on the remote host
    pub remote_root: String,
}

impl Credentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        remote_root: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            port: 22,
            remote_root: remote_root.into(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// `user@host`, as the toolchains address the remote side.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// `user@host:path`, the copy-tool form of a remote file.
    pub fn remote_spec(&self, path: &str) -> String {
        format!("{}:{}", self.destination(), path)
    }
}

/// Authentication state shared between every component talking to one host.
pub struct Session {
    credentials: Credentials,
    secret: RwLock<Option<String>>,
    verified: AtomicBool,
}

impl Session {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            secret: RwLock::new(None),
            verified: AtomicBool::new(false),
        }
    }

    pub fn with_secret(credentials: Credentials, secret: impl Into<String>) -> Self {
        let session = Self::new(credentials);
        session.renew(secret);
        session
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The cached secret, if any.
    pub fn secret(&self) -> Option<String> {
        self.secret
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_secret(&self) -> bool {
        self.secret
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the cached secret. The new secret is unverified until a
    /// connection test succeeds with it.
    pub fn renew(&self, secret: impl Into<String>) {
        *self.secret.write().unwrap_or_else(PoisonError::into_inner) = Some(secret.into());
        self.verified.store(false, Ordering::SeqCst);
    }

    /// Drop the cached secret after the host rejected it.
    pub fn invalidate(&self) {
        *self.secret.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.verified.store(false, Ordering::SeqCst);
        tracing::info!(host = %self.credentials.host, "Cached secret invalidated");
    }

    pub(crate) fn mark_verified(&self) {
        self.verified.store(true, Ordering::SeqCst);
    }

    /// Whether the current secret has been accepted by the host.
    pub fn is_verified(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("secret", &self.has_secret().then_some("<redacted>"))
            .field("verified", &self.is_verified())
            .finish()
    }
}

/// Source of a fresh secret when the cached one is missing or rejected.
pub trait SecretPrompt: Send + Sync {
    /// Ask for a secret. `attempt` starts at 1; `reason` says why the
    /// previous attempt failed. Returning `None` abandons the login.
    fn prompt(&self, credentials: &Credentials, attempt: u32, reason: &str) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("192.168.178.43", "pi", "/media/CHIA/Music")
    }

    #[test]
    fn destination_and_remote_spec() {
        let creds = credentials();
        assert_eq!(creds.destination(), "pi@192.168.178.43");
        assert_eq!(
            creds.remote_spec("/media/CHIA/Music/mix.m3u"),
            "pi@192.168.178.43:/media/CHIA/Music/mix.m3u"
        );
    }

    #[test]
    fn renew_then_invalidate() {
        let session = Session::new(credentials());
        assert!(!session.has_secret());

        session.renew("hunter2");
        assert_eq!(session.secret().as_deref(), Some("hunter2"));
        assert!(!session.is_verified());

        session.mark_verified();
        assert!(session.is_verified());

        session.invalidate();
        assert!(!session.has_secret());
        assert!(!session.is_verified());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let session = Session::with_secret(credentials(), "hunter2");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
