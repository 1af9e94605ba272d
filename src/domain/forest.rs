//! Forest: named, independently loaded trees grouped for comparison.
//!
//! Counts are never combined across trees. Cross-tree views only group each
//! tree's own numbers side by side.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entities::Metadata;
use crate::domain::summary::CoverageSummary;
use crate::domain::tree::CoverageTree;

/// A tree plus the metadata describing where it came from
/// (machine, repository, branch, timestamp, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestEntry {
    pub name: String,
    #[serde(default)]
    pub source: Metadata,
    pub tree: Arc<CoverageTree>,
}

/// Coverage of one package in one tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeCoverage {
    pub tree: String,
    pub total_lines: u64,
    pub covered_lines: u64,
    pub coverage_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Forest {
    entries: BTreeMap<String, ForestEntry>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tree, replacing any entry with the same name.
    /// Returns the replaced entry.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        source: Metadata,
        tree: Arc<CoverageTree>,
    ) -> Option<ForestEntry> {
        let name = name.into();
        self.entries.insert(
            name.clone(),
            ForestEntry {
                name,
                source,
                tree,
            },
        )
    }

    pub fn remove(&mut self, name: &str) -> Option<ForestEntry> {
        self.entries.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ForestEntry> {
        self.entries.get(name)
    }

    /// Entries sorted by name.
    pub fn entries(&self) -> impl Iterator<Item = &ForestEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summaries(&self) -> Vec<(&str, CoverageSummary)> {
        self.entries
            .values()
            .map(|e| (e.name.as_str(), e.tree.summary()))
            .collect()
    }

    /// How `import_path` fares in each tree that contains it.
    pub fn compare(&self, import_path: &str) -> Vec<TreeCoverage> {
        self.entries
            .values()
            .filter_map(|entry| {
                entry.tree.get_package(import_path).map(|p| TreeCoverage {
                    tree: entry.name.clone(),
                    total_lines: p.total_lines,
                    covered_lines: p.covered_lines,
                    coverage_rate: p.coverage_rate,
                })
            })
            .collect()
    }

    /// Every distinct import path across the forest with its per-tree coverage.
    pub fn by_import_path(&self) -> BTreeMap<String, Vec<TreeCoverage>> {
        let mut grouped: BTreeMap<String, Vec<TreeCoverage>> = BTreeMap::new();
        for entry in self.entries.values() {
            for package in entry.tree.packages() {
                grouped
                    .entry(package.import_path.clone())
                    .or_default()
                    .push(TreeCoverage {
                        tree: entry.name.clone(),
                        total_lines: package.total_lines,
                        covered_lines: package.covered_lines,
                        coverage_rate: package.coverage_rate,
                    });
            }
        }
        grouped
    }
}
