//! Arena-backed directory hierarchy.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::coverage_rate;

/// Path separator of import paths.
pub const SEPARATOR: char = '/';

/// Data payload of a directory node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directory {
    /// Last path segment, empty for the root
    pub name: String,
    /// Full slash-separated path, empty for the root
    pub path: String,
    /// Import paths of the packages living directly in this directory
    pub packages: BTreeSet<String>,
    /// Lines of all direct packages and descendant directories
    pub total_lines: u64,
    pub covered_lines: u64,
}

impl Directory {
    pub fn coverage_rate(&self) -> f64 {
        coverage_rate(self.covered_lines, self.total_lines)
    }
}

impl fmt::Display for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Directory node in the arena.
#[derive(Debug, Clone)]
pub struct DirectoryNode {
    pub data: Directory,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Child directories keyed by path segment
    pub children: BTreeMap<String, Index>,
}

/// Directory hierarchy rooted at "".
///
/// Uses a generational arena so nodes reference each other by index instead
/// of by pointer; the root always exists.
#[derive(Debug, Clone)]
pub struct DirectoryArena {
    arena: Arena<DirectoryNode>,
    root: Index,
}

impl Default for DirectoryArena {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryArena {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(DirectoryNode {
            data: Directory::default(),
            parent: None,
            children: BTreeMap::new(),
        });
        Self { arena, root }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn root_node(&self) -> &DirectoryNode {
        &self.arena[self.root]
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Never true: the root directory always exists.
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, idx: Index) -> Option<&DirectoryNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut DirectoryNode> {
        self.arena.get_mut(idx)
    }

    /// Returns the directory for `segments`, creating missing nodes on the way.
    ///
    /// Idempotent: walking an existing path creates nothing.
    #[instrument(level = "trace", skip(self))]
    pub fn ensure_path(&mut self, segments: &[&str]) -> Index {
        let mut current = self.root;
        for segment in segments {
            let existing = self
                .arena
                .get(current)
                .and_then(|node| node.children.get(*segment).copied());
            current = match existing {
                Some(child) => child,
                None => self.insert_child(current, segment),
            };
        }
        current
    }

    fn insert_child(&mut self, parent: Index, segment: &str) -> Index {
        let parent_path = self
            .arena
            .get(parent)
            .map(|node| node.data.path.clone())
            .unwrap_or_default();
        let path = if parent_path.is_empty() {
            segment.to_string()
        } else {
            format!("{parent_path}{SEPARATOR}{segment}")
        };
        let child = self.arena.insert(DirectoryNode {
            data: Directory {
                name: segment.to_string(),
                path,
                ..Directory::default()
            },
            parent: Some(parent),
            children: BTreeMap::new(),
        });
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.insert(segment.to_string(), child);
        }
        child
    }

    /// Looks up a directory by its full path ("" is the root).
    pub fn find(&self, path: &str) -> Option<Index> {
        let mut current = self.root;
        for segment in path.split(SEPARATOR).filter(|s| !s.is_empty()) {
            current = *self.arena.get(current)?.children.get(segment)?;
        }
        Some(current)
    }

    pub fn iter(&self) -> DirectoryIterator<'_> {
        DirectoryIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }
}

/// Pre-order traversal, children in segment order.
pub struct DirectoryIterator<'a> {
    arena: &'a DirectoryArena,
    stack: Vec<Index>,
}

impl<'a> DirectoryIterator<'a> {
    fn new(arena: &'a DirectoryArena) -> Self {
        Self {
            arena,
            stack: vec![arena.root()],
        }
    }
}

impl<'a> Iterator for DirectoryIterator<'a> {
    type Item = (Index, &'a DirectoryNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.values().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

/// Post-order traversal: every child is yielded before its parent.
pub struct PostOrderIterator<'a> {
    arena: &'a DirectoryArena,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(arena: &'a DirectoryArena) -> Self {
        Self {
            arena,
            stack: vec![(arena.root(), false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a DirectoryNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.values().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_new_arena_then_only_root_exists() {
        let arena = DirectoryArena::new();
        assert_eq!(arena.len(), 1);
        let root = arena.get_node(arena.root()).unwrap();
        assert_eq!(root.data.name, "");
        assert_eq!(root.data.path, "");
        assert!(root.parent.is_none());
    }

    #[test]
    fn given_existing_path_when_ensuring_again_then_no_duplicate_nodes() {
        let mut arena = DirectoryArena::new();
        let first = arena.ensure_path(&["a", "b"]);
        let second = arena.ensure_path(&["a", "b"]);
        assert_eq!(first, second);
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get_node(first).unwrap().data.path, "a/b");
        assert_eq!(arena.find("a/b"), Some(first));
        assert_eq!(arena.find(""), Some(arena.root()));
        assert_eq!(arena.find("a/x"), None);
    }

    // root
    // └── a
    //     ├── b
    //     └── c
    #[test]
    fn given_hierarchy_when_iterating_postorder_then_children_before_parents() {
        let mut arena = DirectoryArena::new();
        arena.ensure_path(&["a", "c"]);
        arena.ensure_path(&["a", "b"]);

        let post: Vec<String> = arena
            .iter_postorder()
            .map(|(_, n)| n.data.path.clone())
            .collect();
        assert_eq!(post, vec!["a/b", "a/c", "a", ""]);

        let pre: Vec<String> = arena.iter().map(|(_, n)| n.data.path.clone()).collect();
        assert_eq!(pre, vec!["", "a", "a/b", "a/c"]);
    }
}
