//! Domain layer: coverage tree, queries and rollups
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;
pub mod filter;
pub mod forest;
pub mod metadata;
pub mod records;
pub mod summary;
pub mod tree;

pub use arena::{Directory, DirectoryArena, DirectoryNode};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use filter::{compile_glob, PackageFilter, PackageMatcher};
pub use forest::{Forest, ForestEntry, TreeCoverage};
pub use metadata::{MetadataSource, StaticMetadata};
pub use records::{DecodedFunction, DecodedPackage, DecodedPod, DecodedUnit};
pub use summary::CoverageSummary;
pub use tree::CoverageTree;
