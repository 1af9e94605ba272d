//! Forest persistence
//!
//! Keeps the named trees of a [`Forest`] in one JSON document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Forest, ForestEntry};
use crate::infrastructure::traits::FileSystem;

/// Version of the persisted document layout.
pub const FOREST_VERSION: u32 = 1;

#[derive(Serialize)]
struct ForestDocumentRef<'a> {
    version: u32,
    trees: Vec<&'a ForestEntry>,
}

#[derive(Deserialize)]
struct ForestDocument {
    version: u32,
    #[serde(default)]
    trees: Vec<ForestEntry>,
}

/// Service reading and writing the forest file.
pub struct ForestStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl ForestStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the forest; a missing file is an empty forest.
    pub fn load(&self) -> ApplicationResult<Forest> {
        debug!("load forest: {}", self.path.display());
        if !self.fs.exists(&self.path) {
            return Ok(Forest::new());
        }

        let content = self
            .fs
            .read_to_string(&self.path)
            .with_path_context("read forest", &self.path)?;
        let document: ForestDocument =
            serde_json::from_str(&content).map_err(|e| ApplicationError::OperationFailed {
                context: format!("parse forest {}", self.path.display()),
                source: Box::new(e),
            })?;
        if document.version != FOREST_VERSION {
            return Err(ApplicationError::Config {
                message: format!(
                    "{}: unsupported forest version {} (expected {})",
                    self.path.display(),
                    document.version,
                    FOREST_VERSION
                ),
            });
        }

        let mut forest = Forest::new();
        for entry in document.trees {
            forest.add(entry.name, entry.source, entry.tree);
        }
        debug!("load forest: {} trees", forest.len());
        Ok(forest)
    }

    /// Writes the forest through a temporary file and a rename.
    pub fn save(&self, forest: &Forest) -> ApplicationResult<()> {
        debug!("save forest: {} trees to {}", forest.len(), self.path.display());
        let document = ForestDocumentRef {
            version: FOREST_VERSION,
            trees: forest.entries().collect(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| {
            ApplicationError::OperationFailed {
                context: "serialize forest".into(),
                source: Box::new(e),
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        self.fs
            .ensure_parent(&self.path)
            .with_path_context("create forest directory", &self.path)?;
        self.fs
            .write(&tmp, &json)
            .with_path_context("write forest", &tmp)?;
        self.fs
            .rename(&tmp, &self.path)
            .with_path_context("replace forest", &self.path)?;
        Ok(())
    }
}
