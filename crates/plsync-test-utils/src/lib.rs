//! Shared test utilities for the plsync workspace.
//!
//! This crate provides standardised fixtures so crate and integration tests
//! build libraries and fake remotes the same way. It is a dev-dependency
//! only and never published.
//!
//! # Modules
//!
//! - [`library`]: [`TestLibrary`] builder for a local library plus playlists
//! - [`remote`]: seeding a [`MemoryTransport`](plsync_transport::MemoryTransport)
//!   with a remote library

pub mod library;
pub mod remote;

pub use library::{TestLibrary, track_key};
pub use remote::{REMOTE_ROOT, credentials, manifest_text, remote_library};
