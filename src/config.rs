//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/covtree/covtree.toml`
//! 3. Local config: `<coverage root>/.covtree.toml` (next to the capture directories)
//! 4. Environment variables: `COVTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Metadata;

/// File name prefixes identifying capture artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Prefix of meta artifacts (`covmeta.<hash>`)
    pub meta_prefix: String,
    /// Prefix of counter artifacts (`covcounters.<hash>.<pid>.<time>`)
    pub counter_prefix: String,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            meta_prefix: "covmeta.".into(),
            counter_prefix: "covcounters.".into(),
        }
    }
}

/// Raw artifact config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawArtifactConfig {
    pub meta_prefix: Option<String>,
    pub counter_prefix: Option<String>,
}

impl ArtifactConfig {
    fn merge(&self, overlay: &RawArtifactConfig) -> Self {
        Self {
            meta_prefix: overlay
                .meta_prefix
                .clone()
                .unwrap_or_else(|| self.meta_prefix.clone()),
            counter_prefix: overlay
                .counter_prefix
                .clone()
                .unwrap_or_else(|| self.counter_prefix.clone()),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub max_depth: Option<usize>,
    pub parallel: Option<bool>,
    pub forest_file: Option<PathBuf>,
    pub metadata_env_prefix: Option<String>,
    pub metadata: Option<Metadata>,
    pub artifacts: RawArtifactConfig,
}

/// Unified configuration for covtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Deepest directory level searched for captures (root = 0); unlimited if unset
    pub max_depth: Option<usize>,
    /// Decode capture locations on a thread pool
    pub parallel: bool,
    /// Where the forest of named trees is persisted
    pub forest_file: PathBuf,
    /// Environment variables with this prefix become tree metadata
    pub metadata_env_prefix: String,
    /// Default tree metadata
    pub metadata: Metadata,
    pub artifacts: ArtifactConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: None,
            parallel: true,
            forest_file: dirs_default_base_dir().join("forest.json"),
            metadata_env_prefix: "COVTREE_META_".into(),
            metadata: Metadata::new(),
            artifacts: ArtifactConfig::default(),
        }
    }
}

/// Get the default base directory (~/.covtree).
fn dirs_default_base_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".covtree"))
        .unwrap_or_else(|| PathBuf::from("~/.covtree"))
}

/// Get the XDG config directory for covtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "covtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("covtree.toml"))
}

/// Get the path to the local config file of a coverage root.
pub fn local_config_path(root: &Path) -> PathBuf {
    root.join(".covtree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge metadata maps: overlay keys win, `!key` removes an inherited key.
///
/// # Examples
/// ```ignore
/// merge_metadata({env: ci, test: unit}, {test: e2e})  // → {env: ci, test: e2e}
/// merge_metadata({env: ci, test: unit}, {"!env": ""}) // → {test: unit}
/// ```
pub fn merge_metadata(base: &Metadata, overlay: &Metadata) -> Metadata {
    let mut result = base.clone();
    for (key, value) in overlay {
        if let Some(negated) = key.strip_prefix('!') {
            result.remove(negated);
        } else {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = shellexpand::full(self.forest_file.to_string_lossy().as_ref())
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.forest_file.to_string_lossy().into_owned());
        self.forest_file = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base); metadata merges per key.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            max_depth: overlay.max_depth.or(self.max_depth),
            parallel: overlay.parallel.unwrap_or(self.parallel),
            forest_file: overlay
                .forest_file
                .clone()
                .unwrap_or_else(|| self.forest_file.clone()),
            metadata_env_prefix: overlay
                .metadata_env_prefix
                .clone()
                .unwrap_or_else(|| self.metadata_env_prefix.clone()),
            metadata: overlay
                .metadata
                .as_ref()
                .map(|m| merge_metadata(&self.metadata, m))
                .unwrap_or_else(|| self.metadata.clone()),
            artifacts: self.artifacts.merge(&overlay.artifacts),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for metadata.
    ///
    /// Compiled defaults carry no metadata; the global file defines the baseline
    /// that local files then extend.
    fn apply_global(&self, global: &RawSettings) -> Self {
        let mut merged = self.merge_with(global);
        if let Some(metadata) = &global.metadata {
            merged.metadata = merge_metadata(&Metadata::new(), metadata);
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `root` - Optional coverage root holding a local `.covtree.toml`
    pub fn load(root: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(root) = root {
            let local_path = local_config_path(root);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Load settings from one explicit file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ApplicationError> {
        let raw = load_raw_settings(path)?;
        let mut settings = Self::default().apply_global(&raw);
        settings.expand_paths();
        Ok(settings)
    }

    /// Apply COVTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("COVTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<usize>("max_depth") {
            settings.max_depth = Some(val);
        }
        if let Ok(val) = config.get_bool("parallel") {
            settings.parallel = val;
        }
        if let Ok(val) = config.get_string("forest_file") {
            settings.forest_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("metadata_env_prefix") {
            settings.metadata_env_prefix = val;
        }
        if let Ok(val) = config.get_string("artifacts.meta_prefix") {
            settings.artifacts.meta_prefix = val;
        }
        if let Ok(val) = config.get_string("artifacts.counter_prefix") {
            settings.artifacts.counter_prefix = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# covtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/covtree/covtree.toml  (defines your baseline)
#   Local:  <coverage root>/.covtree.toml   (per-dataset additions)
#   Env:    COVTREE_* environment variables (explicit overrides)
#
# Metadata Merge Semantics:
#   Global metadata REPLACES compiled defaults.
#   Local metadata is merged key by key on top of global.
#   Use "!key" in local config to REMOVE an inherited key:
#     [metadata]
#     "!environment" = ""

# Deepest directory level searched for captures (root = 0)
# max_depth = 6

# Decode capture directories in parallel
# parallel = true

# Where `covtree forest` keeps its named trees
# forest_file = "~/.covtree/forest.json"

# Environment variables with this prefix become tree metadata
# (COVTREE_META_TEST=unit -> test = "unit")
# metadata_env_prefix = "COVTREE_META_"

[metadata]
# Default metadata copied into every package
# environment = "ci"
# repository = "github.com/acme/widgets"

[artifacts]
# meta_prefix = "covmeta."
# counter_prefix = "covcounters."
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::default();
        assert!(settings.forest_file.to_string_lossy().contains(".covtree"));
        assert_eq!(settings.artifacts.meta_prefix, "covmeta.");
        assert_eq!(settings.artifacts.counter_prefix, "covcounters.");
        assert!(settings.max_depth.is_none());
        assert!(settings.parallel);
    }

    #[test]
    fn given_tilde_in_forest_file_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            forest_file: PathBuf::from("~/.covtree/forest.json"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let path = settings.forest_file.to_string_lossy();
        assert!(path.starts_with(&home), "should start with home: {path}");
        assert!(!path.contains('~'));
    }

    #[test]
    fn test_merge_metadata_overlay_wins() {
        let base = meta(&[("env", "ci"), ("test", "unit")]);
        let overlay = meta(&[("test", "e2e"), ("branch", "main")]);
        let result = merge_metadata(&base, &overlay);
        assert_eq!(
            result,
            meta(&[("branch", "main"), ("env", "ci"), ("test", "e2e")])
        );
    }

    #[test]
    fn test_merge_metadata_negation() {
        let base = meta(&[("env", "ci"), ("test", "unit")]);
        let overlay = meta(&[("!env", ""), ("!missing", "")]);
        let result = merge_metadata(&base, &overlay);
        assert_eq!(result, meta(&[("test", "unit")]));
    }

    #[test]
    fn test_apply_global_replaces_metadata() {
        let base = Settings {
            metadata: meta(&[("env", "ci")]),
            ..Settings::default()
        };
        let global = RawSettings {
            metadata: Some(meta(&[("repository", "acme")])),
            max_depth: Some(4),
            ..RawSettings::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.metadata, meta(&[("repository", "acme")]));
        assert_eq!(result.max_depth, Some(4));
        assert!(result.parallel);
    }

    #[test]
    fn test_merge_with_keeps_base_when_not_specified() {
        let base = Settings {
            max_depth: Some(2),
            metadata: meta(&[("env", "ci")]),
            ..Settings::default()
        };
        let overlay = RawSettings {
            parallel: Some(false),
            artifacts: RawArtifactConfig {
                meta_prefix: Some("meta-".into()),
                counter_prefix: None,
            },
            ..RawSettings::default()
        };

        let result = base.merge_with(&overlay);

        assert_eq!(result.max_depth, Some(2));
        assert!(!result.parallel);
        assert_eq!(result.metadata, meta(&[("env", "ci")]));
        assert_eq!(result.artifacts.meta_prefix, "meta-");
        assert_eq!(result.artifacts.counter_prefix, "covcounters.");
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.max_depth.is_none());
    }
}
