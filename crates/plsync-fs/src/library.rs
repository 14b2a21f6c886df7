//! Library root handling and the naming convention check
//!
//! Tracks live under a single library root and follow the layout
//! `Artist - Album (Year)/NN Artist - Title.ext`. Manifests may list them as
//! absolute local paths (`E:\Albums\...`) or as root-relative keys; both
//! normalize to the same [`NormalizedPath`].

use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::NormalizedPath;

static ALBUM_FOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+ - .+ \(\d{4}\)$").unwrap());

static TRACK_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3} .+ - .+\.[A-Za-z0-9]+$").unwrap());

/// The local library root that manifest entries are made relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRoot {
    /// Root as configured, without trailing separators
    display: String,
    /// Root with forward slashes, used for prefix matching
    slashed: String,
    /// Whether absolute paths are rebuilt with backslashes
    windows_style: bool,
}

impl LibraryRoot {
    pub fn new(root: impl AsRef<str>) -> Self {
        let raw = root.as_ref().trim();
        let display = raw.trim_end_matches(['/', '\\']).to_string();
        let slashed = display.replace('\\', "/");
        let bytes = display.as_bytes();
        let windows_style = display.contains('\\')
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':');
        Self {
            display,
            slashed,
            windows_style,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Canonicalize a manifest entry to a library-relative key.
    ///
    /// Strips the root prefix (case-insensitively, whole components only) and
    /// converts separators. Entries outside the root pass through with only
    /// separator conversion; this never fails.
    pub fn normalize(&self, path: &str) -> NormalizedPath {
        let normalized = NormalizedPath::new(path);
        let text = normalized.as_str();

        if let Some(rest) = self.strip_root(text) {
            let mut key = NormalizedPath::new(rest.trim_start_matches('/'));
            while let Some(rest) = self.strip_root(key.as_str()) {
                key = NormalizedPath::new(rest.trim_start_matches('/'));
            }
            return key;
        }

        if normalized.is_absolute() {
            tracing::debug!(path = %text, root = %self.display, "Path outside library root, passing through");
        }
        normalized
    }

    fn strip_root<'a>(&self, text: &'a str) -> Option<&'a str> {
        if self.slashed.is_empty() {
            return None;
        }
        let head = text.get(..self.slashed.len())?;
        if !head.eq_ignore_ascii_case(&self.slashed) {
            return None;
        }
        let rest = &text[self.slashed.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    /// Rebuild the absolute local path for a key.
    ///
    /// Keys that are already absolute (they were outside the root) are
    /// returned as they are.
    pub fn denormalize(&self, path: &NormalizedPath) -> PathBuf {
        if path.is_absolute() {
            return PathBuf::from(self.localize(path.as_str()));
        }
        let joined = format!("{}/{}", self.slashed, path.as_str());
        PathBuf::from(self.localize(&joined))
    }

    fn localize(&self, slashed: &str) -> String {
        if self.windows_style {
            slashed.replace('/', "\\")
        } else {
            slashed.to_string()
        }
    }
}

impl fmt::Display for LibraryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// Why a path does not follow the library naming convention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryPathError {
    #[error("path too short: expected an album folder and a track file")]
    TooShort,

    #[error("invalid album folder '{folder}': expected 'Artist - Album (Year)'")]
    InvalidFolder { folder: String },

    #[error("invalid track file '{file}': expected 'NN Artist - Title.ext'")]
    InvalidFileName { file: String },
}

/// Check a path against `Artist - Album (Year)/NN Artist - Title.ext`.
///
/// Only the last two components are inspected, so both keys and absolute
/// paths can be checked. Returns `None` when the path conforms.
pub fn verify_library_path(path: &str) -> Option<LibraryPathError> {
    let normalized = NormalizedPath::new(path);
    let (Some(folder), Some(file)) = (normalized.folder_name(), normalized.file_name()) else {
        return Some(LibraryPathError::TooShort);
    };

    if !ALBUM_FOLDER.is_match(folder) {
        return Some(LibraryPathError::InvalidFolder {
            folder: folder.to_string(),
        });
    }
    if !TRACK_FILE.is_match(file) {
        return Some(LibraryPathError::InvalidFileName {
            file: file.to_string(),
        });
    }
    None
}
