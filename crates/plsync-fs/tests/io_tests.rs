use plsync_fs::io;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_write_atomic_creates_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mix.m3u");

    io::write_atomic(&path, b"hello world").unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content, "hello world");
}

#[test]
fn test_write_atomic_overwrites_existing() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mix.m3u");
    fs::write(&path, "original").unwrap();

    io::write_atomic(&path, b"updated").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "updated");
}

#[test]
fn test_write_atomic_creates_parent_directories() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("deeper").join("mix.m3u");

    io::write_atomic(&path, b"x").unwrap();

    assert!(path.exists());
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("mix.m3u");

    io::write_atomic(&path, b"one").unwrap();
    io::write_atomic(&path, b"two").unwrap();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["mix.m3u".to_string()]);
}

#[test]
fn test_read_bytes_nonexistent_file() {
    let temp = TempDir::new().unwrap();
    let err = io::read_bytes(&temp.path().join("absent.m3u")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_copy_file_creates_destination_directory() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a.mp3");
    fs::write(&source, b"audio").unwrap();
    let dest = temp.path().join("Artist - Album (2020)").join("a.mp3");

    let copied = io::copy_file(&source, &dest).unwrap();

    assert_eq!(copied, 5);
    assert_eq!(fs::read(&dest).unwrap(), b"audio");
}

#[test]
fn test_remove_if_exists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.mp3");
    fs::write(&path, b"audio").unwrap();

    assert!(io::remove_if_exists(&path).unwrap());
    assert!(!io::remove_if_exists(&path).unwrap());
}
