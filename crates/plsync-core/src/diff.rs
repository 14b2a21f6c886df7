//! Local/remote manifest comparison
//!
//! The remote copy of a playlist lives at `<remote root>/<playlist file
//! name>`. A comparison fetches it once into a scratch directory (the fetch
//! doubles as the existence check), normalizes both sides to library keys
//! and computes the symmetric difference.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use plsync_fs::{LibraryRoot, Manifest, NormalizedPath, verify_library_path};
use plsync_transport::{Transfer, TransportClient};
use serde::{Deserialize, Serialize};

use crate::progress::{Liveness, Progress, report};
use crate::{Error, Result};

/// A manifest entry that does not follow the library naming convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidPath {
    pub path: NormalizedPath,
    pub reason: String,
}

/// Outcome of comparing a local playlist with its remote copy.
///
/// When `exists_remotely` is false the playlist was not found on the remote
/// side and the difference sets are empty; that is a state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Absolute local paths listed locally but not remotely
    pub missing_remotely: BTreeSet<PathBuf>,
    /// Absolute local paths listed remotely but not locally
    pub missing_locally: BTreeSet<PathBuf>,
    /// Distinct tracks in the local manifest
    pub total_files: usize,
    pub exists_remotely: bool,
    pub has_invalid_paths: bool,
    pub invalid_paths: Vec<InvalidPath>,
}

impl ComparisonResult {
    /// The playlist does not exist on the remote side.
    pub fn not_found() -> Self {
        Self::default()
    }

    /// Compute the difference between two key sets.
    pub fn from_keys(
        local: &BTreeSet<NormalizedPath>,
        remote: &BTreeSet<NormalizedPath>,
        root: &LibraryRoot,
    ) -> Self {
        let invalid_paths: Vec<InvalidPath> = local
            .iter()
            .filter_map(|key| {
                verify_library_path(key.as_str()).map(|e| InvalidPath {
                    path: key.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();

        Self {
            missing_remotely: local.difference(remote).map(|k| root.denormalize(k)).collect(),
            missing_locally: remote.difference(local).map(|k| root.denormalize(k)).collect(),
            total_files: local.len(),
            exists_remotely: true,
            has_invalid_paths: !invalid_paths.is_empty(),
            invalid_paths,
        }
    }

    /// Both sides list the same tracks.
    pub fn is_in_sync(&self) -> bool {
        self.exists_remotely && self.missing_remotely.is_empty() && self.missing_locally.is_empty()
    }
}

/// Compares a local playlist against the copy on the remote host.
#[derive(Debug, Clone)]
pub struct DiffEngine {
    client: TransportClient,
    root: LibraryRoot,
    /// The remote root as a library root, for manifests holding absolute remote paths
    remote_root: LibraryRoot,
    extensions: Vec<String>,
    liveness: Liveness,
}

impl DiffEngine {
    pub fn new(client: TransportClient, root: LibraryRoot) -> Self {
        let remote_root = LibraryRoot::new(client.remote_root());
        Self {
            client,
            root,
            remote_root,
            extensions: Vec::new(),
            liveness: Liveness::new(),
        }
    }

    /// Only consider entries with these (lowercase) extensions.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_liveness(mut self, liveness: Liveness) -> Self {
        self.liveness = liveness;
        self
    }

    /// Remote location of `playlist`'s counterpart.
    pub fn remote_manifest_path(&self, playlist: &Path) -> Result<String> {
        remote_manifest_path(self.client.remote_root(), playlist)
    }

    fn is_track(&self, key: &NormalizedPath) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        key.extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Library keys of the tracks in a local manifest.
    pub fn local_keys(&self, manifest: &Manifest) -> BTreeSet<NormalizedPath> {
        manifest
            .keys(&self.root)
            .into_iter()
            .filter(|k| self.is_track(k))
            .collect()
    }

    /// Library keys of the tracks in a remote manifest.
    pub fn remote_keys(&self, manifest: &Manifest) -> BTreeSet<NormalizedPath> {
        manifest
            .entries
            .iter()
            .map(|entry| normalize_remote(&self.root, &self.remote_root, entry))
            .filter(|k| self.is_track(k))
            .collect()
    }

    /// Compare `playlist` with its remote copy.
    ///
    /// Progress reaches 25 after the local manifest is read, 50 after the
    /// remote one and 100 at completion.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] when the host cannot be reached or rejects the
    /// login; [`Error::RemoteManifestUnreadable`] when the remote copy was
    /// fetched but cannot be read; local read failures.
    pub async fn compare(&self, playlist: &Path, progress: Option<&Progress>) -> Result<ComparisonResult> {
        let remote_path = self.remote_manifest_path(playlist)?;
        tracing::info!(playlist = %playlist.display(), remote = %remote_path, "Comparing playlist");

        // The directory, and the fetched copy with it, is removed on every exit path.
        let scratch = tempfile::TempDir::new()?;
        let fetched = scratch.path().join("remote.m3u");

        match self.client.copy_from_remote(&remote_path, &fetched).await {
            Ok(Transfer::Completed) => {}
            Ok(Transfer::NotFound) => {
                tracing::info!(remote = %remote_path, "Playlist not found remotely");
                report(progress, 100);
                return Ok(ComparisonResult::not_found());
            }
            Err(e) if e.is_connection() => return Err(Error::Connection(e)),
            Err(e) => {
                tracing::warn!(remote = %remote_path, error = %e, "Remote playlist fetch failed, treating as absent");
                report(progress, 100);
                return Ok(ComparisonResult::not_found());
            }
        }

        let local = Manifest::read(playlist)?;
        let local_keys = self.local_keys(&local);
        tracing::debug!(tracks = local_keys.len(), "Read local manifest");
        report(progress, 25);

        self.liveness.check()?;
        tokio::task::yield_now().await;

        let remote = Manifest::read(&fetched).map_err(|e| Error::RemoteManifestUnreadable {
            path: remote_path.clone(),
            reason: e.to_string(),
        })?;
        let remote_keys = self.remote_keys(&remote);
        tracing::debug!(tracks = remote_keys.len(), "Read remote manifest");
        report(progress, 50);

        let result = ComparisonResult::from_keys(&local_keys, &remote_keys, &self.root);
        if result.has_invalid_paths {
            tracing::warn!(count = result.invalid_paths.len(), "Playlist has paths outside the naming convention");
        }
        tracing::info!(
            missing_remotely = result.missing_remotely.len(),
            missing_locally = result.missing_locally.len(),
            total = result.total_files,
            "Comparison complete"
        );
        report(progress, 100);
        Ok(result)
    }
}

/// `<remote root>/<playlist file name>`.
pub(crate) fn remote_manifest_path(remote_root: &str, playlist: &Path) -> Result<String> {
    let name = playlist
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| plsync_fs::Error::NoFileName {
            path: playlist.to_path_buf(),
        })?;
    Ok(NormalizedPath::new(&name).under_remote_root(remote_root))
}

/// Normalize a remote manifest entry, which may be a key, an absolute
/// remote path or (in old files) an absolute local path.
pub(crate) fn normalize_remote(
    root: &LibraryRoot,
    remote_root: &LibraryRoot,
    entry: &str,
) -> NormalizedPath {
    let key = remote_root.normalize(entry);
    root.normalize(key.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(items: &[&str]) -> BTreeSet<NormalizedPath> {
        items.iter().map(NormalizedPath::new).collect()
    }

    #[test]
    fn from_keys_computes_both_differences() {
        let root = LibraryRoot::new("/srv/music");
        let result = ComparisonResult::from_keys(
            &keys(&["A - X (2000)/01 A - a.mp3", "B - X (2000)/01 B - b.mp3"]),
            &keys(&["B - X (2000)/01 B - b.mp3", "D - X (2000)/01 D - d.mp3"]),
            &root,
        );

        assert_eq!(
            result.missing_remotely,
            BTreeSet::from([PathBuf::from("/srv/music/A - X (2000)/01 A - a.mp3")])
        );
        assert_eq!(
            result.missing_locally,
            BTreeSet::from([PathBuf::from("/srv/music/D - X (2000)/01 D - d.mp3")])
        );
        assert_eq!(result.total_files, 2);
        assert!(result.exists_remotely);
        assert!(!result.has_invalid_paths);
    }

    #[test]
    fn invalid_local_paths_are_flagged_not_rejected() {
        let root = LibraryRoot::new("/srv/music");
        let result = ComparisonResult::from_keys(&keys(&["Misc/song.mp3"]), &keys(&[]), &root);

        assert!(result.has_invalid_paths);
        assert_eq!(result.invalid_paths.len(), 1);
        assert_eq!(result.missing_remotely.len(), 1);
    }

    #[test]
    fn remote_manifest_path_uses_file_name() {
        assert_eq!(
            remote_manifest_path("/media/CHIA/Music", Path::new("/lists/Road Trip.m3u")).unwrap(),
            "/media/CHIA/Music/Road Trip.m3u"
        );
    }

    #[test]
    fn remote_entries_with_absolute_remote_paths_normalize_to_keys() {
        let root = LibraryRoot::new(r"E:\Albums");
        let remote_root = LibraryRoot::new("/media/CHIA/Music");
        assert_eq!(
            normalize_remote(&root, &remote_root, "/media/CHIA/Music/A - B (1999)/01 A - C.mp3").as_str(),
            "A - B (1999)/01 A - C.mp3"
        );
        assert_eq!(
            normalize_remote(&root, &remote_root, "A - B (1999)/01 A - C.mp3").as_str(),
            "A - B (1999)/01 A - C.mp3"
        );
    }

    #[test]
    fn result_serializes_for_caching() {
        let root = LibraryRoot::new("/srv/music");
        let result = ComparisonResult::from_keys(&keys(&["A - X (2000)/01 A - a.mp3"]), &keys(&[]), &root);
        let json = serde_json::to_string(&result).unwrap();
        let back: ComparisonResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
