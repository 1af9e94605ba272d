//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{CoverageLoader, ForestStore, LoadOptions};
use crate::config::Settings;
use crate::domain::StaticMetadata;
use crate::infrastructure::decoder::JsonPodDecoder;
use crate::infrastructure::discovery::PodLocator;
use crate::infrastructure::metadata::EnvMetadataSource;
use crate::infrastructure::traits::{FileSystem, LocationFinder, PodDecoder, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Pod decoder
    pub decoder: Arc<dyn PodDecoder>,

    /// Capture location discovery
    pub finder: Arc<dyn LocationFinder>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let decoder = Arc::new(JsonPodDecoder::new(fs.clone(), settings.artifacts.clone()));
        let finder = Arc::new(PodLocator::new(fs.clone(), settings.artifacts.clone()));
        Self::with_deps(settings, fs, decoder, finder)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        decoder: Arc<dyn PodDecoder>,
        finder: Arc<dyn LocationFinder>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            decoder,
            finder,
        }
    }

    /// Loader seeded with configured metadata, then `<prefix>*` env vars.
    pub fn loader(&self) -> CoverageLoader {
        CoverageLoader::new(self.decoder.clone(), self.finder.clone())
            .with_options(LoadOptions::from_settings(&self.settings))
            .with_metadata_source(&StaticMetadata(self.settings.metadata.clone()))
            .with_metadata_source(&EnvMetadataSource::new(
                self.settings.metadata_env_prefix.clone(),
            ))
    }

    pub fn forest_store(&self) -> ForestStore {
        ForestStore::new(self.fs.clone(), self.settings.forest_file.clone())
    }
}
