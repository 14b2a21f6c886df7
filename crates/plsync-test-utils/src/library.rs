//! [`TestLibrary`] builder for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build a key that follows the library naming convention:
/// `Artist - Album (Year)/NN Artist - Title.mp3`.
pub fn track_key(artist: &str, album: &str, year: u16, number: u8, title: &str) -> String {
    format!("{artist} - {album} ({year})/{number:02} {artist} - {title}.mp3")
}

/// A temporary directory holding a local library (`library/`) and a
/// playlists folder (`playlists/`).
///
/// # Example
///
/// ```rust,no_run
/// use plsync_test_utils::TestLibrary;
///
/// let lib = TestLibrary::new();
/// lib.add_track("A - B (2000)/01 A - C.mp3");
/// let playlist = lib.write_playlist("mix.m3u", &["A - B (2000)/01 A - C.mp3"]);
/// lib.assert_track_exists("A - B (2000)/01 A - C.mp3");
/// ```
pub struct TestLibrary {
    temp_dir: TempDir,
}

impl Default for TestLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLibrary {
    /// Create the directory layout.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("library")).unwrap();
        fs::create_dir_all(temp_dir.path().join("playlists")).unwrap();
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The local library root.
    pub fn root(&self) -> PathBuf {
        self.path().join("library")
    }

    /// The local library root as a string, the form configuration takes.
    pub fn root_str(&self) -> String {
        self.root().to_string_lossy().into_owned()
    }

    pub fn playlists_dir(&self) -> PathBuf {
        self.path().join("playlists")
    }

    /// Absolute local path of a library key.
    pub fn track_path(&self, key: &str) -> PathBuf {
        key.split('/').fold(self.root(), |path, part| path.join(part))
    }

    /// The manifest line a local player would write for `key`.
    pub fn manifest_line(&self, key: &str) -> String {
        format!("{}/{}", self.root_str(), key)
    }

    /// Create a track file whose content names its key.
    pub fn add_track(&self, key: &str) -> PathBuf {
        let path = self.track_path(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, format!("audio:{key}")).unwrap();
        path
    }

    /// Write a playlist of absolute local paths into the playlists folder.
    pub fn write_playlist(&self, name: &str, keys: &[&str]) -> PathBuf {
        let text: String = keys
            .iter()
            .map(|k| format!("{}\n", self.manifest_line(k)))
            .collect();
        self.write_playlist_text(name, &text)
    }

    /// Write a playlist with verbatim content.
    pub fn write_playlist_text(&self, name: &str, text: &str) -> PathBuf {
        let path = self.playlists_dir().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    pub fn read_playlist(&self, name: &str) -> String {
        fs::read_to_string(self.playlists_dir().join(name)).unwrap()
    }

    /// # Panics
    /// Panics with a descriptive message if the track does not exist.
    pub fn assert_track_exists(&self, key: &str) {
        let path = self.track_path(key);
        assert!(path.exists(), "Expected track to exist: {}", path.display());
    }

    /// # Panics
    /// Panics with a descriptive message if the track exists.
    pub fn assert_track_not_exists(&self, key: &str) {
        let path = self.track_path(key);
        assert!(
            !path.exists(),
            "Expected track NOT to exist: {}",
            path.display()
        );
    }
}
