//! End-to-end tests of the plsync binary
//!
//! Only commands that need no remote host are exercised here; transfers
//! are covered against the in-memory transport in plsync-core.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
[library]
local_root = "/music"

[remote]
host = "192.168.178.43"
username = "pi"
root = "/media/CHIA/Music"
"#;

/// A command isolated from any user-level configuration.
fn plsync(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("plsync"));
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("NO_COLOR", "1")
        .env_remove("PLSYNC_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn project_with_backups() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plsync.toml"), CONFIG).unwrap();
    fs::write(dir.path().join("mix.m3u"), "current\n").unwrap();
    let backups = dir.path().join("backups");
    fs::create_dir_all(&backups).unwrap();
    for day in 1..=3 {
        fs::write(
            backups.join(format!("mix_2024010{day}_120000.m3u")),
            format!("backup {day}\n"),
        )
        .unwrap();
    }
    // Another playlist's backup must not be listed
    fs::write(backups.join("mix_party_20240101_120000.m3u"), "party\n").unwrap();
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("backups"))
        .stdout(predicate::str::contains("check-path"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("plsync"));
}

#[test]
fn test_no_command_prints_hint() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("plsync --help"));
}

#[test]
fn test_check_path_accepts_convention() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .args([
            "check-path",
            "Daft Punk - Discovery (2001)/01 Daft Punk - One More Time.mp3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_check_path_rejects_loose_files() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .args([
            "check-path",
            "Misc/song.mp3",
            "Daft Punk - Discovery (2001)/01 Daft Punk - One More Time.mp3",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID"))
        .stderr(predicate::str::contains("1 path(s)"));
}

#[test]
fn test_check_path_strips_configured_root() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plsync.toml"), CONFIG).unwrap();
    plsync(dir.path())
        .args([
            "check-path",
            "/music/Daft Punk - Discovery (2001)/01 Daft Punk - One More Time.mp3",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK Daft Punk - Discovery (2001)"));
}

#[test]
fn test_analyze_without_configuration_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("mix.m3u"), "").unwrap();
    plsync(dir.path())
        .args(["analyze", "mix.m3u"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configuration found"));
}

#[test]
fn test_incomplete_configuration_names_the_key() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("custom.toml"),
        "[library]\nlocal_root = \"/music\"\n",
    )
    .unwrap();
    plsync(dir.path())
        .args(["--config", "custom.toml", "analyze", "mix.m3u"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing required key 'remote.host'"));
}

#[test]
fn test_sync_requires_an_operation() {
    let dir = TempDir::new().unwrap();
    plsync(dir.path())
        .args(["sync", "mix.m3u"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--push"));
}

#[test]
fn test_backups_list_shows_only_this_playlist() {
    let dir = project_with_backups();
    plsync(dir.path())
        .args(["backups", "list", "mix.m3u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(3)"))
        .stdout(predicate::str::contains("mix_20240103_120000.m3u"))
        .stdout(predicate::str::contains("mix_party").not());
}

#[test]
fn test_backups_list_json() {
    let dir = project_with_backups();
    let output = plsync(dir.path())
        .args(["backups", "list", "mix.m3u", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 3);
}

#[test]
fn test_backups_list_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("plsync.toml"), CONFIG).unwrap();
    plsync(dir.path())
        .args(["backups", "list", "mix.m3u"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups"));
}

#[test]
fn test_backups_prune_keeps_newest() {
    let dir = project_with_backups();
    plsync(dir.path())
        .args(["backups", "prune", "mix.m3u", "--keep", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 2 old backup(s)"));

    let backups = dir.path().join("backups");
    assert!(backups.join("mix_party_20240101_120000.m3u").exists());
    let remaining = fs::read_dir(&backups).unwrap().count();
    assert_eq!(remaining, 2);
}

#[test]
fn test_backups_prune_rejects_zero() {
    let dir = project_with_backups();
    plsync(dir.path())
        .args(["backups", "prune", "mix.m3u", "--keep", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_backups_restore_named_backup() {
    let dir = project_with_backups();
    plsync(dir.path())
        .args([
            "backups",
            "restore",
            "mix.m3u",
            "--backup",
            "backups/mix_20240101_120000.m3u",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored"));

    assert_eq!(
        fs::read_to_string(dir.path().join("mix.m3u")).unwrap(),
        "backup 1\n"
    );
}

#[test]
fn test_backups_restore_without_terminal_needs_yes() {
    let dir = project_with_backups();
    plsync(dir.path())
        .args(["backups", "restore", "mix.m3u"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    assert_eq!(
        fs::read_to_string(dir.path().join("mix.m3u")).unwrap(),
        "current\n"
    );
}
