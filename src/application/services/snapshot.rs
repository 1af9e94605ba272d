//! Atomically swappable handle to the current tree.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::domain::CoverageTree;

/// Shared, lock-free reference to the latest loaded tree.
///
/// Readers take a snapshot with [`SharedTree::load`] and keep a consistent
/// view for as long as they hold it, even across reloads.
pub struct SharedTree {
    current: ArcSwap<CoverageTree>,
}

impl Default for SharedTree {
    fn default() -> Self {
        Self::new(CoverageTree::new())
    }
}

impl SharedTree {
    pub fn new(tree: CoverageTree) -> Self {
        Self {
            current: ArcSwap::from_pointee(tree),
        }
    }

    pub fn load(&self) -> Arc<CoverageTree> {
        self.current.load_full()
    }

    /// Publishes `tree`, returning the snapshot it replaced.
    pub fn replace(&self, tree: Arc<CoverageTree>) -> Arc<CoverageTree> {
        self.current.swap(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_reader_snapshot_when_replaced_then_reader_keeps_old_tree() {
        let shared = SharedTree::default();
        let before = shared.load();

        let mut next = CoverageTree::new();
        next.set_metadata("branch", "main");
        let previous = shared.replace(Arc::new(next));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.get_metadata("branch"), None);
        assert_eq!(shared.load().get_metadata("branch"), Some("main"));
    }
}
