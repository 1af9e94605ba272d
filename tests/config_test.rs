//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: per-key merge with `!key` removal
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use covtree::application::ApplicationError;
use covtree::config::{local_config_path, Settings};

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    let root = TempDir::new().unwrap();
    fs::write(
        local_config_path(root.path()),
        r#"
max_depth = 3
parallel = false

[artifacts]
meta_prefix = "meta-"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(root.path())).expect("load settings");

    assert_eq!(settings.max_depth, Some(3));
    assert!(!settings.parallel);
    assert_eq!(settings.artifacts.meta_prefix, "meta-");
    // not mentioned locally: default survives
    assert_eq!(settings.artifacts.counter_prefix, "covcounters.");
}

#[test]
fn given_local_metadata_when_load_then_added_to_tree_defaults() {
    let root = TempDir::new().unwrap();
    fs::write(
        local_config_path(root.path()),
        r#"
[metadata]
repository = "example.com/repo"
environment = "ci"
"#,
    )
    .unwrap();

    let settings = Settings::load(Some(root.path())).expect("load settings");

    assert_eq!(
        settings.metadata.get("repository").map(String::as_str),
        Some("example.com/repo")
    );
    assert_eq!(settings.metadata.get("environment").map(String::as_str), Some("ci"));
}

#[test]
fn given_explicit_file_when_from_file_then_expands_forest_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "forest_file = \"~/trees.json\"\n").unwrap();

    let settings = Settings::from_file(&path).expect("load settings");

    assert!(!settings.forest_file.to_string_lossy().starts_with('~'));
    assert!(settings.forest_file.ends_with("trees.json"));
}

#[test]
fn given_broken_toml_when_from_file_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "max_depth = [").unwrap();

    let result = Settings::from_file(&path);

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_missing_file_when_from_file_then_config_error() {
    let result = Settings::from_file(&PathBuf::from("/nonexistent/covtree.toml"));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}
