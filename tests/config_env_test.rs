//! Environment overrides of Settings.
//!
//! Kept in its own test binary: the variables are process-wide and would
//! leak into the file-based config tests running in parallel.

use std::env;
use std::fs;

use tempfile::TempDir;

use covtree::config::{local_config_path, Settings};

#[test]
fn given_covtree_env_vars_when_load_then_they_override_local_config() {
    let root = TempDir::new().unwrap();
    fs::write(
        local_config_path(root.path()),
        r#"
max_depth = 1

[artifacts]
meta_prefix = "meta-"
"#,
    )
    .unwrap();
    env::set_var("COVTREE_MAX_DEPTH", "3");
    env::set_var("COVTREE_ARTIFACTS__META_PREFIX", "capmeta.");

    let settings = Settings::load(Some(root.path())).expect("load settings");

    env::remove_var("COVTREE_MAX_DEPTH");
    env::remove_var("COVTREE_ARTIFACTS__META_PREFIX");
    assert_eq!(settings.max_depth, Some(3));
    assert_eq!(settings.artifacts.meta_prefix, "capmeta.");
    assert_eq!(settings.artifacts.counter_prefix, "covcounters.");
}
