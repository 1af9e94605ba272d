//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, PodDecoder, ...)
//! but are themselves concrete structs, not traits.

mod forest;
mod loader;
mod snapshot;

pub use forest::{ForestStore, FOREST_VERSION};
pub use loader::{CoverageLoader, LoadOptions};
pub use snapshot::SharedTree;
