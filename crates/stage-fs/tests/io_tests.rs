use assert_fs::prelude::*;
use predicates::prelude::*;
use stage_fs::{NormalizedPath, io};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_ensure_dir_creates_parents() {
    let temp = assert_fs::TempDir::new().unwrap();
    let dir = temp.path().join("a").join("b").join("c");

    io::ensure_dir(&dir).unwrap();

    temp.child("a/b/c").assert(predicate::path::is_dir());
}

#[test]
fn test_ensure_dir_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("ws");

    io::ensure_dir(&dir).unwrap();
    io::ensure_dir(&dir).unwrap();

    assert!(dir.is_dir());
}

#[test]
fn test_ensure_dir_fails_on_file_collision() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("occupied").write_str("not a dir").unwrap();

    let result = io::ensure_dir(&temp.path().join("occupied"));

    assert!(result.is_err(), "a file in the way must fail directory creation");
}

#[test]
fn test_remove_dir_all_if_exists_reports_removal() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("ws/input/item.txt").write_str("data").unwrap();

    let removed = io::remove_dir_all_if_exists(&temp.path().join("ws")).unwrap();

    assert!(removed);
    temp.child("ws").assert(predicate::path::missing());
}

#[test]
fn test_remove_dir_all_if_exists_missing_is_ok() {
    let temp = TempDir::new().unwrap();
    let removed = io::remove_dir_all_if_exists(&temp.path().join("never-created")).unwrap();
    assert!(!removed);
}

#[test]
fn test_copy_dir_all_copies_nested_tree() {
    let source = assert_fs::TempDir::new().unwrap();
    source.child("manifest.json").write_str("{}").unwrap();
    source.child("brushes/soft.abr").write_binary(b"\x00\x01").unwrap();

    let dest = assert_fs::TempDir::new().unwrap();
    let copied = io::copy_dir_all(source.path(), &dest.path().join("package")).unwrap();

    assert_eq!(copied, 2);
    dest.child("package/manifest.json").assert("{}");
    dest.child("package/brushes/soft.abr")
        .assert(predicate::path::is_file());
}

#[test]
fn test_write_atomic_creates_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("package").join("manifest.json"));

    io::write_atomic(&path, b"{\"a\":1}").unwrap();

    assert_eq!(fs::read_to_string(path.to_native()).unwrap(), "{\"a\":1}");
}

#[test]
fn test_write_atomic_leaves_no_temp_files() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("target.txt"));

    io::write_atomic(&path, b"content").unwrap();

    let leftovers: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "found temp files: {leftovers:?}");
}

#[test]
fn test_read_text_nonexistent_file() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("missing.txt"));
    let err = io::read_text(&path).unwrap_err();
    assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
}

#[test]
fn test_lock_state_follows_holder() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(stage_fs::LOCK_FILENAME);
    assert_eq!(io::lock_state(&path).unwrap(), io::LockState::Missing);

    let held = io::lock_exclusive(&path).unwrap();
    assert_eq!(io::lock_state(&path).unwrap(), io::LockState::Held);

    drop(held);
    assert_eq!(io::lock_state(&path).unwrap(), io::LockState::Free);
}

#[test]
fn test_lock_exclusive_refuses_second_holder() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(stage_fs::LOCK_FILENAME);
    let _held = io::lock_exclusive(&path).unwrap();

    let err = io::lock_exclusive(&path).unwrap_err();

    assert!(matches!(err, stage_fs::Error::LockFailed { .. }));
}
