//! Tests for the real FileSystem implementation

use std::fs;

use tempfile::TempDir;

use covtree::infrastructure::traits::{FileSystem, RealFileSystem};

// ============================================================
// list_files tests
// ============================================================

#[test]
fn given_mixed_entries_when_list_files_then_only_files_sorted_by_name() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("covmeta.b"), "{}").unwrap();
    fs::write(temp.path().join("covcounters.a.1.1"), "{}").unwrap();
    fs::create_dir_all(temp.path().join("covmeta.dir")).unwrap();

    // Act
    let files = RealFileSystem.list_files(temp.path()).unwrap();

    // Assert
    assert_eq!(
        files,
        vec![
            temp.path().join("covcounters.a.1.1"),
            temp.path().join("covmeta.b"),
        ]
    );
}

#[test]
fn given_missing_dir_when_list_files_then_error() {
    let temp = TempDir::new().unwrap();

    assert!(RealFileSystem.list_files(&temp.path().join("gone")).is_err());
}

// ============================================================
// write / rename tests
// ============================================================

#[test]
fn given_nested_target_when_ensure_parent_then_write_and_rename_succeed() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("a").join("b").join("forest.json");
    let tmp = target.with_extension("json.tmp");
    let fs = RealFileSystem;

    // Act
    fs.ensure_parent(&target).unwrap();
    fs.write(&tmp, "{\"version\":1}").unwrap();
    fs.rename(&tmp, &target).unwrap();

    // Assert
    assert!(fs.exists(&target));
    assert!(!fs.exists(&tmp));
    assert!(fs.is_dir(&temp.path().join("a").join("b")));
    assert_eq!(fs.read_to_string(&target).unwrap(), "{\"version\":1}");
}
