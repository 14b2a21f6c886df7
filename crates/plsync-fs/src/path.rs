//! Canonical track keys
//!
//! A [`NormalizedPath`] is the equality key used by every set operation in
//! plsync: a library-root-relative path with forward slashes, independent of
//! the platform the manifest was written on. Use
//! [`LibraryRoot::normalize`](crate::LibraryRoot::normalize) to build one from
//! a raw manifest line; [`NormalizedPath::new`] only fixes separators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A library-relative path normalized to forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Convert backslashes to forward slashes and collapse repeated
    /// separators. Applying it twice is a no-op.
    pub fn new(path: impl AsRef<str>) -> Self {
        let slashed = path.as_ref().trim().replace('\\', "/");
        let mut inner = String::with_capacity(slashed.len());
        let mut previous_slash = false;
        for ch in slashed.chars() {
            if ch == '/' {
                if previous_slash {
                    continue;
                }
                previous_slash = true;
            } else {
                previous_slash = false;
            }
            inner.push(ch);
        }
        Self { inner }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Path components, skipping empty segments.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.inner.split('/').filter(|c| !c.is_empty())
    }

    /// The last component (the track file name).
    pub fn file_name(&self) -> Option<&str> {
        self.components().last()
    }

    /// The component directly above the file (the album folder).
    pub fn folder_name(&self) -> Option<&str> {
        let components: Vec<&str> = self.components().collect();
        components.len().checked_sub(2).map(|idx| components[idx])
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name()?;
        let idx = name.rfind('.')?;
        if idx == 0 || idx + 1 == name.len() {
            return None;
        }
        Some(name[idx + 1..].to_ascii_lowercase())
    }

    /// Whether the key still looks like an absolute path (it was not under
    /// the library root when normalized).
    pub fn is_absolute(&self) -> bool {
        let bytes = self.inner.as_bytes();
        self.inner.starts_with('/')
            || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
    }

    /// Case-folded form used for case-insensitive matching of manifest entries.
    pub fn folded(&self) -> String {
        self.inner.to_lowercase()
    }

    /// Address this key under a POSIX remote root.
    pub fn under_remote_root(&self, remote_root: &str) -> String {
        let root = remote_root.trim_end_matches('/');
        let key = self.inner.trim_start_matches('/');
        if root.is_empty() {
            format!("/{}", key)
        } else {
            format!("{}/{}", root, key)
        }
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<str> for NormalizedPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_repeated_separators() {
        let path = NormalizedPath::new("Artist - Album (2020)//\\01 Artist - Title.mp3");
        assert_eq!(path.as_str(), "Artist - Album (2020)/01 Artist - Title.mp3");
    }

    #[test]
    fn folder_and_file_name() {
        let path = NormalizedPath::new("Artist - Album (2020)/01 Artist - Title.mp3");
        assert_eq!(path.folder_name(), Some("Artist - Album (2020)"));
        assert_eq!(path.file_name(), Some("01 Artist - Title.mp3"));
    }

    #[test]
    fn folder_name_absent_for_single_component() {
        assert_eq!(NormalizedPath::new("song.mp3").folder_name(), None);
    }

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            NormalizedPath::new("a/01 X - Y.MP3").extension().as_deref(),
            Some("mp3")
        );
        assert_eq!(NormalizedPath::new("a/.hidden").extension(), None);
    }

    #[test]
    fn detects_absolute_forms() {
        assert!(NormalizedPath::new("E:\\Other\\x.mp3").is_absolute());
        assert!(NormalizedPath::new("/srv/x.mp3").is_absolute());
        assert!(!NormalizedPath::new("Artist - Album (2020)/x.mp3").is_absolute());
    }

    #[test]
    fn under_remote_root_joins_with_single_slash() {
        let key = NormalizedPath::new("A - B (2001)/01 A - C.mp3");
        assert_eq!(
            key.under_remote_root("/media/CHIA/Music/"),
            "/media/CHIA/Music/A - B (2001)/01 A - C.mp3"
        );
    }
}
