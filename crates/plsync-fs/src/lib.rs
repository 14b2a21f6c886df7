//! Filesystem layer for plsync
//!
//! Provides the canonical track key ([`NormalizedPath`]), library root
//! handling and naming-convention checks, the playlist manifest codec, and
//! the checksum/atomic-write primitives the backup layer is built on.

pub mod checksum;
pub mod error;
pub mod io;
pub mod library;
pub mod manifest;
pub mod path;

pub use checksum::Checksum;
pub use error::{Error, Result};
pub use library::{LibraryPathError, LibraryRoot, verify_library_path};
pub use manifest::{Manifest, ManifestStyle};
pub use path::NormalizedPath;
