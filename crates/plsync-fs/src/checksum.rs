//! SHA-256 checksums
//!
//! One canonical format (`sha256:<hex>`) is used for every integrity check:
//! backup verification, restore verification and manifest rewrites.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

use crate::{Error, Result};

const PREFIX: &str = "sha256:";

/// A content checksum in `sha256:<hex>` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Checksum of an in-memory buffer.
    pub fn of_bytes(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(format!("{}{:x}", PREFIX, hasher.finalize()))
    }

    /// Checksum of a file's full contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn of_file(path: &Path) -> Result<Self> {
        let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::of_bytes(&content))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
