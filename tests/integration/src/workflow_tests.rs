//! End-to-end playlist workflows
//!
//! Each test drives the controller the way the CLI does: log in, compare,
//! plan, sync and compare again, with an in-memory host standing in for
//! the remote library.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use chrono::{Local, TimeZone};
use plsync_core::{BackupManager, ErrorKind, Selection, SyncConfig, SyncController, SyncPlan};
use plsync_fs::{LibraryRoot, verify_library_path};
use plsync_test_utils::{
    REMOTE_ROOT, TestLibrary, credentials, manifest_text, remote_library, track_key,
};
use plsync_transport::{Credentials, MemoryTransport, SecretPrompt, Session};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn controller_with(
    lib: &TestLibrary,
    session: Arc<Session>,
    transport: Arc<MemoryTransport>,
) -> SyncController {
    let config = SyncConfig::new(lib.root_str(), &credentials());
    SyncController::with_transport(config, session, transport)
}

fn controller(lib: &TestLibrary, transport: Arc<MemoryTransport>) -> SyncController {
    controller_with(lib, Arc::new(Session::new(credentials())), transport)
}

fn remote(key: &str) -> String {
    format!("{REMOTE_ROOT}/{key}")
}

/// Answers login prompts from a fixed list.
struct ScriptedPrompt {
    answers: Mutex<Vec<&'static str>>,
    asked: Mutex<u32>,
}

impl ScriptedPrompt {
    fn new(answers: &[&'static str]) -> Self {
        let mut answers = answers.to_vec();
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            asked: Mutex::new(0),
        }
    }

    fn asked(&self) -> u32 {
        *self.asked.lock().unwrap()
    }
}

impl SecretPrompt for ScriptedPrompt {
    fn prompt(&self, _credentials: &Credentials, _attempt: u32, _reason: &str) -> Option<String> {
        *self.asked.lock().unwrap() += 1;
        self.answers.lock().unwrap().pop().map(str::to_string)
    }
}

#[tokio::test]
async fn test_two_way_sync_converges_and_can_be_undone() {
    let a = track_key("Artist", "Album", 2020, 1, "A");
    let b = track_key("Artist", "Album", 2020, 2, "B");
    let c = track_key("Artist", "Album", 2020, 3, "C");
    let d = track_key("Artist", "Album", 2020, 4, "D");

    let lib = TestLibrary::new();
    for key in [&a, &b, &c] {
        lib.add_track(key);
    }
    let playlist = lib.write_playlist("mix.m3u", &[&a, &b, &c]);
    let original = lib.read_playlist("mix.m3u");
    let transport = Arc::new(remote_library("mix.m3u", &[&b, &c, &d]));
    let ctl = controller(&lib, transport.clone());

    let before = ctl.analyze(&playlist, None).await.unwrap();
    assert!(before.exists_remotely);
    assert_eq!(before.total_files, 3);
    assert_eq!(before.missing_remotely.iter().collect::<Vec<_>>(), vec![&lib.track_path(&a)]);
    assert_eq!(before.missing_locally.iter().collect::<Vec<_>>(), vec![&lib.track_path(&d)]);

    let plan = SyncPlan::from_comparison(
        &before,
        ctl.config().library_root(),
        Selection {
            push: true,
            pull: true,
            ..Default::default()
        },
    )
    .unwrap()
    .with_manifest_rewrite(true);
    let report = ctl.sync(&playlist, &plan, None).await.unwrap();

    assert_eq!(report.completed.len(), 2);
    assert!(report.manifest_rewritten);
    assert_eq!(transport.file(&remote(&a)).unwrap(), format!("audio:{a}").into_bytes());
    lib.assert_track_exists(&d);
    assert_eq!(
        transport.file(&remote("mix.m3u")).unwrap(),
        manifest_text(&[&b, &c, &d, &a]).into_bytes()
    );
    let expected_local: String = [&a, &b, &c, &d]
        .iter()
        .map(|k| format!("{}\n", lib.manifest_line(k)))
        .collect();
    assert_eq!(lib.read_playlist("mix.m3u"), expected_local);

    let after = ctl.analyze(&playlist, None).await.unwrap();
    assert!(after.is_in_sync());

    let backup = report.backup.expect("pulling requires a backup");
    ctl.restore_backup(&backup.path, &playlist).unwrap();
    assert_eq!(lib.read_playlist("mix.m3u"), original);
}

#[tokio::test]
async fn test_absent_remote_playlist_is_not_an_error() {
    let lib = TestLibrary::new();
    let playlist = lib.write_playlist("mix.m3u", &[&track_key("A", "B", 2001, 1, "C")]);
    let transport = Arc::new(MemoryTransport::new().with_dir(REMOTE_ROOT));

    let result = controller(&lib, transport).analyze(&playlist, None).await.unwrap();

    assert!(!result.exists_remotely);
    assert!(result.missing_remotely.is_empty());
    assert!(result.missing_locally.is_empty());
}

#[tokio::test]
async fn test_login_retries_until_the_secret_is_accepted() {
    let lib = TestLibrary::new();
    let key = track_key("A", "B", 2001, 1, "C");
    let playlist = lib.write_playlist("mix.m3u", &[&key]);
    let session = Arc::new(Session::new(credentials()));
    let transport =
        Arc::new(remote_library("mix.m3u", &[&key]).require_secret(session.clone(), "s3cret"));
    let ctl = controller_with(&lib, session.clone(), transport);
    let prompt = ScriptedPrompt::new(&["wrong", "s3cret"]);

    ctl.connect(&prompt).await.unwrap();

    assert_eq!(prompt.asked(), 2);
    assert_eq!(session.secret().as_deref(), Some("s3cret"));
    assert!(ctl.analyze(&playlist, None).await.unwrap().is_in_sync());
}

#[tokio::test]
async fn test_login_gives_up_after_configured_attempts() {
    let lib = TestLibrary::new();
    let session = Arc::new(Session::new(credentials()));
    let transport = Arc::new(remote_library("mix.m3u", &[]).require_secret(session.clone(), "s3cret"));
    let ctl = controller_with(&lib, session, transport);
    let prompt = ScriptedPrompt::new(&["one", "two", "three", "four"]);

    let err = ctl.connect(&prompt).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(prompt.asked(), ctl.config().remote.max_auth_attempts);
}

#[tokio::test]
async fn test_windows_library_paths_are_keyed_by_convention() {
    let temp = TempDir::new().unwrap();
    let playlist = temp.path().join("mix.m3u");
    fs::write(
        &playlist,
        "E:\\Albums\\Artist - Album (2020)\\01 Artist - Title.mp3\r\nE:\\Albums\\Misc\\song.mp3\r\n",
    )
    .unwrap();
    let transport = Arc::new(remote_library(
        "mix.m3u",
        &["Artist - Album (2020)/01 Artist - Title.mp3"],
    ));
    let config = SyncConfig::new(r"E:\Albums", &credentials());
    let ctl = SyncController::with_transport(config, Arc::new(Session::new(credentials())), transport);

    let result = ctl.analyze(&playlist, None).await.unwrap();

    let root = LibraryRoot::new(r"E:\Albums");
    let key = root.normalize(r"E:\Albums\Artist - Album (2020)\01 Artist - Title.mp3");
    assert_eq!(key.as_str(), "Artist - Album (2020)/01 Artist - Title.mp3");
    assert!(verify_library_path(key.as_str()).is_none());
    assert_eq!(result.missing_remotely.len(), 1);
    assert!(result.missing_locally.is_empty());
    assert_eq!(result.invalid_paths.len(), 1);
    assert_eq!(result.invalid_paths[0].path.as_str(), "Misc/song.mp3");
}

#[tokio::test]
async fn test_failed_upload_leaves_both_playlists_untouched() {
    let key = track_key("A", "B", 2001, 1, "C");
    let lib = TestLibrary::new();
    lib.add_track(&key);
    let playlist = lib.write_playlist("mix.m3u", &[&key]);
    let local_before = fs::read(&playlist).unwrap();
    let transport = Arc::new(remote_library("mix.m3u", &[]));
    transport.fail_copies_of(remote(&key));
    let ctl = controller(&lib, transport.clone());

    let result = ctl.analyze(&playlist, None).await.unwrap();
    let plan = SyncPlan::from_comparison(
        &result,
        ctl.config().library_root(),
        Selection {
            push: true,
            ..Default::default()
        },
    )
    .unwrap()
    .with_manifest_rewrite(true);

    assert!(ctl.sync(&playlist, &plan, None).await.is_err());
    assert_eq!(fs::read(&playlist).unwrap(), local_before);
    assert_eq!(transport.file(&remote("mix.m3u")).unwrap(), b"");
    assert!(!transport.contains(&remote(&key)));
}

fn touch(path: &Path, age_minutes: u64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(age_minutes * 60))
        .unwrap();
}

#[test]
fn test_backup_names_and_retention() {
    let at = Local.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
        BackupManager::backup_name(Path::new("playlist.m3u"), at).unwrap(),
        "playlist_20240101_000000.m3u"
    );

    let temp = TempDir::new().unwrap();
    let playlist = temp.path().join("playlist.m3u");
    fs::write(&playlist, "").unwrap();
    let manager = BackupManager::new(temp.path().join("backups"));
    fs::create_dir_all(manager.dir()).unwrap();
    for day in 1..=8u64 {
        let path = manager.dir().join(format!("playlist_2024010{day}_000000.m3u"));
        fs::write(&path, format!("{day}\n")).unwrap();
        // Day 8 is the newest
        touch(&path, 100 - day);
    }

    let removed = manager.cleanup_old_backups(&playlist, 5).unwrap();

    assert_eq!(removed.len(), 3);
    let mut kept: Vec<String> = manager
        .list_backups(&playlist)
        .unwrap()
        .into_iter()
        .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    kept.sort();
    assert_eq!(
        kept,
        (4..=8)
            .map(|day| format!("playlist_2024010{day}_000000.m3u"))
            .collect::<Vec<_>>()
    );
}
