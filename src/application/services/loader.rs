//! Coverage loader
//!
//! Turns a filesystem root (or an explicit list of capture locations) into a
//! populated [`CoverageTree`]. Individual locations may fail; only a load in
//! which nothing at all could be ingested is an error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::services::snapshot::SharedTree;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{CoverageTree, DecodedPod, Metadata, MetadataSource};
use crate::infrastructure::error::DecodeError;
use crate::infrastructure::traits::{LocationFinder, PodDecoder};

/// Knobs of a single load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Deepest directory level searched (root = 0); unlimited if unset
    pub max_depth: Option<usize>,
    /// Decode locations on the rayon pool; ingestion stays on the calling thread
    pub parallel: bool,
    /// Checked between per-location decode attempts
    pub cancel: CancellationToken,
}

impl LoadOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_depth: settings.max_depth,
            parallel: settings.parallel,
            cancel: CancellationToken::new(),
        }
    }
}

type DecodeOutcome = (PathBuf, Result<Vec<DecodedPod>, DecodeError>);

/// Service building coverage trees from capture directories.
pub struct CoverageLoader {
    decoder: Arc<dyn PodDecoder>,
    finder: Arc<dyn LocationFinder>,
    options: LoadOptions,
    defaults: Metadata,
}

impl CoverageLoader {
    pub fn new(decoder: Arc<dyn PodDecoder>, finder: Arc<dyn LocationFinder>) -> Self {
        Self {
            decoder,
            finder,
            options: LoadOptions::default(),
            defaults: Metadata::new(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds defaults seeded into every tree this loader creates.
    pub fn with_metadata_source(mut self, source: &dyn MetadataSource) -> Self {
        self.defaults.extend(source.metadata());
        self
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Fresh tree carrying the loader's default metadata.
    pub fn new_tree(&self) -> CoverageTree {
        let mut tree = CoverageTree::new();
        for (key, value) in &self.defaults {
            tree.set_metadata(key.clone(), value.clone());
        }
        tree
    }

    /// Discover, decode and ingest everything under `root`.
    pub fn load(&self, root: &Path) -> ApplicationResult<CoverageTree> {
        self.load_into(self.new_tree(), root)
    }

    /// Like [`CoverageLoader::load`], into a tree whose metadata the caller
    /// already configured.
    pub fn load_into(&self, tree: CoverageTree, root: &Path) -> ApplicationResult<CoverageTree> {
        debug!("load: root={}", root.display());
        let locations = self
            .finder
            .find_candidate_locations(root, self.options.max_depth);
        self.load_locations_into(tree, root, &locations)
    }

    /// Ingest already-identified locations, in the given order.
    ///
    /// Later locations win when two pods define the same import path.
    pub fn load_locations(
        &self,
        root: &Path,
        locations: &[PathBuf],
    ) -> ApplicationResult<CoverageTree> {
        self.load_locations_into(self.new_tree(), root, locations)
    }

    pub fn load_locations_into(
        &self,
        mut tree: CoverageTree,
        root: &Path,
        locations: &[PathBuf],
    ) -> ApplicationResult<CoverageTree> {
        if locations.is_empty() {
            return Err(ApplicationError::NoDataFound {
                root: root.to_path_buf(),
            });
        }

        let outcomes = self.decode_all(root, locations)?;

        let mut pods = 0;
        let mut records = 0;
        let mut failed_locations = 0;
        let mut rejected_records = 0;
        for (location, outcome) in outcomes {
            match outcome {
                Ok(decoded) => {
                    for pod in decoded {
                        pods += 1;
                        for package in pod.packages {
                            match tree.add_record(package) {
                                Ok(()) => records += 1,
                                Err(e) => {
                                    rejected_records += 1;
                                    warn!("{}: skipping record: {}", location.display(), e);
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    failed_locations += 1;
                    warn!("skipping {}: {}", location.display(), e);
                }
            }
        }

        if records == 0 {
            return Err(ApplicationError::AllDecodesFailed {
                root: root.to_path_buf(),
                attempted: locations.len(),
            });
        }

        tree.recalculate();
        info!(
            "loaded {} records from {} pods in {} locations ({} locations failed, {} records rejected)",
            records,
            pods,
            locations.len(),
            failed_locations,
            rejected_records
        );
        Ok(tree)
    }

    /// Decodes every location, results in input order.
    fn decode_all(
        &self,
        root: &Path,
        locations: &[PathBuf],
    ) -> ApplicationResult<Vec<DecodeOutcome>> {
        let cancel = &self.options.cancel;
        let cancelled = || ApplicationError::Cancelled {
            root: root.to_path_buf(),
        };

        if self.options.parallel {
            // Workers hand results back; ingestion stays single-threaded.
            let outcomes: Vec<Option<DecodeOutcome>> = locations
                .par_iter()
                .map(|location| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some((location.clone(), self.decoder.decode_pods(location)))
                })
                .collect();
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            Ok(outcomes.into_iter().flatten().collect())
        } else {
            let mut outcomes = Vec::with_capacity(locations.len());
            for location in locations {
                if cancel.is_cancelled() {
                    return Err(cancelled());
                }
                outcomes.push((location.clone(), self.decoder.decode_pods(location)));
            }
            Ok(outcomes)
        }
    }

    /// Loads `root` into a new tree and swaps it into `shared`.
    ///
    /// Readers holding the previous snapshot keep it; on failure `shared`
    /// is left untouched.
    pub fn reload(&self, shared: &SharedTree, root: &Path) -> ApplicationResult<Arc<CoverageTree>> {
        let tree = self.load(root)?;
        let tree = Arc::new(tree);
        shared.replace(Arc::clone(&tree));
        Ok(tree)
    }
}
