//! Filesystem discovery of capture locations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::config::ArtifactConfig;
use crate::infrastructure::traits::{FileSystem, LocationFinder};

/// Walks a directory tree looking for capture directories.
///
/// A directory qualifies iff it directly contains at least one meta artifact
/// and at least one counter artifact.
pub struct PodLocator {
    fs: Arc<dyn FileSystem>,
    artifacts: ArtifactConfig,
}

impl PodLocator {
    pub fn new(fs: Arc<dyn FileSystem>, artifacts: ArtifactConfig) -> Self {
        Self { fs, artifacts }
    }

    fn is_candidate(&self, dir: &Path) -> bool {
        let files = match self.fs.list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                warn!("cannot list {}: {}", dir.display(), e);
                return false;
            }
        };
        let mut has_meta = false;
        let mut has_counter = false;
        for name in files.iter().filter_map(|p| p.file_name()?.to_str()) {
            has_meta |= name.starts_with(&self.artifacts.meta_prefix);
            has_counter |= name.starts_with(&self.artifacts.counter_prefix);
        }
        has_meta && has_counter
    }
}

impl LocationFinder for PodLocator {
    #[instrument(level = "debug", skip(self))]
    fn find_candidate_locations(&self, root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
        if !self.fs.is_dir(root) {
            debug!("find_candidate_locations: {} is not a directory", root.display());
            return Vec::new();
        }
        let mut walker = WalkDir::new(root).sort_by_file_name();
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }

        let dirs: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect();
        debug!("find_candidate_locations: {} directories to inspect", dirs.len());

        let mut candidates: Vec<PathBuf> = dirs
            .into_par_iter()
            .filter(|dir| self.is_candidate(dir))
            .collect();
        candidates.sort();

        debug!("find_candidate_locations: {} candidates", candidates.len());
        candidates
    }
}
