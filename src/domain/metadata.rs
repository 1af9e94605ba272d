//! Metadata sources injected into a tree before loading.

use crate::domain::entities::Metadata;

/// Supplies default metadata for a tree.
///
/// The engine never reads process state on its own; callers decide where
/// defaults come from (environment, config file, command line) and hand them
/// in through this trait.
pub trait MetadataSource {
    fn metadata(&self) -> Metadata;
}

/// Fixed key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMetadata(pub Metadata);

impl MetadataSource for StaticMetadata {
    fn metadata(&self) -> Metadata {
        self.0.clone()
    }
}

impl<F> MetadataSource for F
where
    F: Fn() -> Metadata,
{
    fn metadata(&self) -> Metadata {
        self()
    }
}
