//! Comparison scenarios against an in-memory remote

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use plsync_core::{ComparisonResult, ErrorKind, SyncConfig, SyncController};
use plsync_fs::{LibraryRoot, NormalizedPath};
use plsync_test_utils::{REMOTE_ROOT, TestLibrary, credentials, remote_library, track_key};
use plsync_transport::{MemoryTransport, Session};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn controller(lib: &TestLibrary, transport: Arc<MemoryTransport>) -> SyncController {
    let config = SyncConfig::new(lib.root_str(), &credentials());
    let session = Arc::new(Session::new(credentials()));
    SyncController::with_transport(config, session, transport)
}

fn local_paths(lib: &TestLibrary, keys: &[&str]) -> BTreeSet<PathBuf> {
    keys.iter().map(|k| lib.track_path(k)).collect()
}

#[tokio::test]
async fn test_symmetric_difference() {
    let a = track_key("Artist", "Album", 2020, 1, "A");
    let b = track_key("Artist", "Album", 2020, 2, "B");
    let c = track_key("Artist", "Album", 2020, 3, "C");
    let d = track_key("Artist", "Album", 2020, 4, "D");

    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &[&a, &b, &c]);
    let transport = Arc::new(remote_library("mix.m3u", &[&b, &c, &d]));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();

    assert!(result.exists_remotely);
    assert_eq!(result.total_files, 3);
    assert_eq!(result.missing_remotely, local_paths(&lib, &[&a]));
    assert_eq!(result.missing_locally, local_paths(&lib, &[&d]));
    assert!(!result.has_invalid_paths);
}

#[tokio::test]
async fn test_absent_remote_playlist_is_a_state() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["X - Y (2001)/01 X - Z.mp3"]);
    let transport = Arc::new(MemoryTransport::new().with_dir(REMOTE_ROOT));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();

    assert_eq!(result, ComparisonResult::not_found());
    assert!(!result.exists_remotely);
    assert!(result.missing_remotely.is_empty());
    assert!(result.missing_locally.is_empty());
}

#[tokio::test]
async fn test_failing_fetch_is_treated_as_absent() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["a.mp3"]);
    let transport = Arc::new(remote_library("mix.m3u", &["a.mp3"]));
    transport.fail_copies_of(format!("{REMOTE_ROOT}/mix.m3u"));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();
    assert!(!result.exists_remotely);
}

#[tokio::test]
async fn test_unreadable_remote_manifest_is_an_error_not_absence() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["a.mp3"]);
    let transport = Arc::new(remote_library("mix.m3u", &["a.mp3"]));
    transport.unreadable_downloads_of(format!("{REMOTE_ROOT}/mix.m3u"));

    let err = controller(&lib, transport).analyze(&playlist, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(matches!(err, plsync_core::Error::RemoteManifestUnreadable { .. }));
    assert!(err.to_string().contains("mix.m3u"));
}

#[tokio::test]
async fn test_unreachable_host_is_a_connection_error() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["a.mp3"]);
    let transport = Arc::new(remote_library("mix.m3u", &["a.mp3"]));
    transport.set_unreachable(true);

    let err = controller(&lib, transport).analyze(&playlist, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
}

#[tokio::test]
async fn test_empty_local_manifest() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &[]);
    let transport = Arc::new(remote_library("mix.m3u", &["a.mp3", "b.mp3"]));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();

    assert!(result.missing_remotely.is_empty());
    assert_eq!(result.missing_locally, local_paths(&lib, &["a.mp3", "b.mp3"]));
    assert_eq!(result.total_files, 0);
}

#[tokio::test]
async fn test_matching_ignores_separator_style() {
    let lib = TestLibrary::new();
    let line = format!(
        "{}\\Artist - Album (2020)\\01 Artist - Title.mp3",
        lib.root_str()
    );
    let playlist = lib.write_playlist_text("mix.m3u", &format!("#EXTM3U\n{line}\n"));
    let transport = Arc::new(remote_library(
        "mix.m3u",
        &["Artist - Album (2020)/01 Artist - Title.mp3"],
    ));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();
    assert!(result.is_in_sync());
}

#[tokio::test]
async fn test_remote_entries_with_absolute_remote_paths() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["a.mp3"]);
    let transport = Arc::new(
        MemoryTransport::new().with_file(format!("{REMOTE_ROOT}/mix.m3u"), format!("{REMOTE_ROOT}/a.mp3\n")),
    );

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();
    assert!(result.is_in_sync());
}

#[tokio::test]
async fn test_invalid_paths_are_flagged() {
    let lib = TestLibrary::new();
    let valid = track_key("Artist", "Album", 2020, 1, "Title");
    let playlist = lib.write_playlist("mix.m3u", &[&valid, "Misc/song.mp3"]);
    let transport = Arc::new(remote_library("mix.m3u", &[&valid]));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();

    assert!(result.has_invalid_paths);
    assert_eq!(result.invalid_paths.len(), 1);
    assert_eq!(result.invalid_paths[0].path.as_str(), "Misc/song.mp3");
}

#[tokio::test]
async fn test_progress_milestones() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &["a.mp3"]);
    let transport = Arc::new(remote_library("mix.m3u", &["a.mp3"]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = move |p: u8| sink.lock().unwrap().push(p);

    controller(&lib, transport)
        .analyze(&playlist, Some(&progress))
        .await
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![25, 50, 100]);
}

fn key_set() -> impl Strategy<Value = BTreeSet<NormalizedPath>> {
    proptest::collection::btree_set("[a-e]{1,3}/[a-e]{1,3}\\.mp3", 0..8)
        .prop_map(|set| set.into_iter().map(NormalizedPath::new).collect())
}

proptest! {
    #[test]
    fn prop_difference_matches_set_algebra(local in key_set(), remote in key_set()) {
        let root = LibraryRoot::new("/music");
        let result = ComparisonResult::from_keys(&local, &remote, &root);

        let expected_remote: BTreeSet<PathBuf> =
            local.difference(&remote).map(|k| root.denormalize(k)).collect();
        let expected_local: BTreeSet<PathBuf> =
            remote.difference(&local).map(|k| root.denormalize(k)).collect();
        prop_assert_eq!(&result.missing_remotely, &expected_remote);
        prop_assert_eq!(&result.missing_locally, &expected_local);
        prop_assert_eq!(result.total_files, local.len());
    }

    #[test]
    fn prop_swapping_sides_swaps_results(local in key_set(), remote in key_set()) {
        let root = LibraryRoot::new("/music");
        let forward = ComparisonResult::from_keys(&local, &remote, &root);
        let backward = ComparisonResult::from_keys(&remote, &local, &root);

        prop_assert_eq!(forward.missing_remotely, backward.missing_locally);
        prop_assert_eq!(forward.missing_locally, backward.missing_remotely);
    }
}
