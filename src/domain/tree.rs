//! Coverage tree: package map plus directory hierarchy, and the rollup rules.

use std::collections::BTreeMap;

use generational_arena::Index;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, instrument, trace};

use crate::domain::arena::{Directory, DirectoryArena, SEPARATOR};
use crate::domain::entities::{CoverableUnit, Function, Metadata, Package};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::records::DecodedPackage;
use crate::domain::summary::CoverageSummary;

/// Merged coverage of one load.
///
/// The package map is the ground truth for aggregate statistics; the
/// directory hierarchy is a browsing aid kept in sync with it. Every package
/// lives in exactly one directory: `a/b/c` lives in `a/b`, `a` in the root.
///
/// A tree is built once (records added, then [`recalculate`] once) and is
/// read-only afterwards. Reloads build a new tree.
///
/// [`recalculate`]: CoverageTree::recalculate
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "TreeSnapshot")]
pub struct CoverageTree {
    packages: BTreeMap<String, Package>,
    directories: DirectoryArena,
    metadata: Metadata,
}

impl CoverageTree {
    /// Empty tree: no packages, a single root directory with empty name and path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a tree-level default, copied into packages added afterwards.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Inserts or wholesale-replaces the package described by `record`.
    ///
    /// Does not roll up; call [`CoverageTree::recalculate`] once all records
    /// are in.
    pub fn add_record(&mut self, record: DecodedPackage) -> DomainResult<()> {
        let name = if record.name.is_empty() {
            record
                .import_path
                .rsplit(SEPARATOR)
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            record.name
        };
        let functions = record
            .functions
            .into_iter()
            .map(|f| Function {
                name: f.name,
                file: f.file,
                is_literal: f.is_literal,
                units: f
                    .units
                    .into_iter()
                    .map(|u| CoverableUnit {
                        start_line: u.start_line,
                        start_col: u.start_col,
                        end_line: u.end_line,
                        end_col: u.end_col,
                        count: u.count,
                    })
                    .collect(),
                total_lines: 0,
                covered_lines: 0,
                coverage_rate: 0.0,
            })
            .collect();

        self.insert_package(Package {
            import_path: record.import_path,
            module_path: record.module_path,
            name,
            functions,
            metadata: record.metadata,
            total_lines: 0,
            covered_lines: 0,
            coverage_rate: 0.0,
        })
    }

    fn insert_package(&mut self, mut package: Package) -> DomainResult<()> {
        let segments = validate(&package)?;
        let dir_idx = self.directories.ensure_path(&segments[..segments.len() - 1]);
        if let Some(node) = self.directories.get_node_mut(dir_idx) {
            node.data.packages.insert(package.import_path.clone());
        }

        for (key, value) in &self.metadata {
            package
                .metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        if let Some(previous) = self
            .packages
            .insert(package.import_path.clone(), package)
        {
            debug!(
                "add_record: replaced package {} ({} functions discarded)",
                previous.import_path,
                previous.functions.len()
            );
        }
        Ok(())
    }

    /// Bottom-up rollup: units → functions → packages, then one post-order
    /// walk of the directories (children first, then direct packages).
    #[instrument(level = "debug", skip(self), fields(packages = self.packages.len()))]
    pub fn recalculate(&mut self) {
        for package in self.packages.values_mut() {
            package.recalculate();
        }

        let order: Vec<Index> = self
            .directories
            .iter_postorder()
            .map(|(idx, _)| idx)
            .collect();

        for idx in order {
            let Some(node) = self.directories.get_node(idx) else {
                continue;
            };
            let mut total = 0;
            let mut covered = 0;
            for &child in node.children.values() {
                if let Some(child) = self.directories.get_node(child) {
                    total += child.data.total_lines;
                    covered += child.data.covered_lines;
                }
            }
            for import_path in &node.data.packages {
                if let Some(package) = self.packages.get(import_path) {
                    total += package.total_lines;
                    covered += package.covered_lines;
                }
            }
            if let Some(node) = self.directories.get_node_mut(idx) {
                trace!("recalculate: {} {}/{}", node.data.path, covered, total);
                node.data.total_lines = total;
                node.data.covered_lines = covered;
            }
        }
    }

    /// Sums over the package map, independent of directory bookkeeping.
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary::from_packages(self.packages.values())
    }

    pub fn get_package(&self, import_path: &str) -> Option<&Package> {
        self.packages.get(import_path)
    }

    /// All packages, sorted by import path.
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn directories(&self) -> &DirectoryArena {
        &self.directories
    }

    pub fn root(&self) -> &Directory {
        &self.directories.root_node().data
    }

    /// Directory by slash-separated path; "" is the root.
    pub fn directory(&self, path: &str) -> Option<&Directory> {
        self.directories
            .find(path)
            .and_then(|idx| self.directories.get_node(idx))
            .map(|node| &node.data)
    }
}

/// Checks the record shape and returns the import path segments.
fn validate(package: &Package) -> DomainResult<Vec<&str>> {
    let invalid = |reason: String| DomainError::InvalidRecord {
        import_path: package.import_path.clone(),
        reason,
    };

    if package.import_path.is_empty() {
        return Err(invalid("empty import path".into()));
    }
    let segments: Vec<&str> = package.import_path.split(SEPARATOR).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty path segment".into()));
    }
    for function in &package.functions {
        if let Some(unit) = function.units.iter().find(|u| u.end_line < u.start_line) {
            return Err(invalid(format!(
                "unit {}-{} of {} ends before it starts",
                unit.start_line, unit.end_line, function.name
            )));
        }
    }
    Ok(segments)
}

/// Serialized form: metadata plus packages. Directories are derived.
#[derive(Deserialize)]
struct TreeSnapshot {
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    packages: Vec<Package>,
}

#[derive(Serialize)]
struct TreeSnapshotRef<'a> {
    metadata: &'a Metadata,
    packages: Vec<&'a Package>,
}

impl Serialize for CoverageTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TreeSnapshotRef {
            metadata: &self.metadata,
            packages: self.packages.values().collect(),
        }
        .serialize(serializer)
    }
}

impl TryFrom<TreeSnapshot> for CoverageTree {
    type Error = DomainError;

    fn try_from(snapshot: TreeSnapshot) -> Result<Self, Self::Error> {
        let mut tree = CoverageTree {
            metadata: snapshot.metadata,
            ..CoverageTree::default()
        };
        for package in snapshot.packages {
            tree.insert_package(package)?;
        }
        tree.recalculate();
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::records::{DecodedFunction, DecodedUnit};

    fn record(import_path: &str, lines: u32, covered: u32) -> DecodedPackage {
        let mut units = Vec::new();
        for line in 1..=lines {
            units.push(DecodedUnit {
                start_line: line,
                start_col: 1,
                end_line: line,
                end_col: 20,
                count: u64::from(line <= covered),
            });
        }
        DecodedPackage {
            import_path: import_path.into(),
            module_path: "example.com".into(),
            functions: vec![DecodedFunction {
                name: "Run".into(),
                file: "run.go".into(),
                is_literal: false,
                units,
            }],
            ..DecodedPackage::default()
        }
    }

    fn placed(packages: &std::collections::BTreeSet<String>) -> Vec<&str> {
        packages.iter().map(String::as_str).collect()
    }

    #[test]
    fn given_new_tree_then_empty_with_root_directory() {
        let tree = CoverageTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.root().name, "");
        assert_eq!(tree.root().path, "");
        assert_eq!(tree.directories().len(), 1);
    }

    #[test]
    fn given_two_packages_when_recalculating_then_directory_sums_children() {
        let mut tree = CoverageTree::new();
        tree.add_record(record("a/b", 10, 8)).unwrap();
        tree.add_record(record("a/c", 5, 5)).unwrap();
        tree.recalculate();

        let a = tree.directory("a").unwrap();
        assert_eq!(a.total_lines, 15);
        assert_eq!(a.covered_lines, 13);
        assert_eq!(placed(&a.packages), vec!["a/b", "a/c"]);
        assert_eq!(tree.root().total_lines, 15);
        assert_eq!(tree.root().covered_lines, 13);
    }

    #[test]
    fn given_same_import_path_twice_when_adding_then_replaces_and_keeps_single_placement() {
        let mut tree = CoverageTree::new();
        tree.add_record(record("a/b", 10, 8)).unwrap();
        tree.add_record(record("a/b", 4, 1)).unwrap();
        tree.recalculate();

        assert_eq!(tree.package_count(), 1);
        assert_eq!(placed(&tree.directory("a").unwrap().packages), vec!["a/b"]);
        assert_eq!(tree.get_package("a/b").unwrap().total_lines, 4);
        assert_eq!(tree.root().total_lines, 4);
    }

    #[test]
    fn given_many_siblings_added_in_reverse_when_placing_then_directory_lists_each_once_sorted() {
        let mut tree = CoverageTree::new();
        for i in (0..200).rev() {
            tree.add_record(record(&format!("d/p{i:03}"), 1, 1)).unwrap();
        }
        tree.add_record(record("d/p007", 1, 0)).unwrap();
        tree.recalculate();

        let d = tree.directory("d").unwrap();
        let listed = placed(&d.packages);
        assert_eq!(listed.len(), 200);
        assert_eq!(listed.first(), Some(&"d/p000"));
        assert_eq!(listed.last(), Some(&"d/p199"));
        assert!(listed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(d.total_lines, 200);
        assert_eq!(d.covered_lines, 199);
    }

    #[test]
    fn given_tree_metadata_when_adding_then_package_keys_take_precedence() {
        let mut tree = CoverageTree::new();
        tree.set_metadata("environment", "ci");
        tree.set_metadata("test", "unit");

        let mut rec = record("pkg", 1, 1);
        rec.metadata.insert("test".into(), "integration".into());
        tree.add_record(rec).unwrap();

        let pkg = tree.get_package("pkg").unwrap();
        assert_eq!(pkg.metadata("environment"), Some("ci"));
        assert_eq!(pkg.metadata("test"), Some("integration"));
        assert_eq!(pkg.name, "pkg");
        assert_eq!(placed(&tree.root().packages), vec!["pkg"]);
    }

    #[test]
    fn given_malformed_import_path_when_adding_then_rejected() {
        let mut tree = CoverageTree::new();
        for bad in ["", "a//b", "/a", "a/"] {
            let err = tree.add_record(record(bad, 1, 1)).unwrap_err();
            assert!(matches!(err, DomainError::InvalidRecord { .. }), "{bad}");
        }
        assert!(tree.is_empty());
        assert_eq!(tree.directories().len(), 1);
    }

    #[test]
    fn given_unit_ending_before_start_when_adding_then_rejected() {
        let mut tree = CoverageTree::new();
        let mut rec = record("a", 1, 1);
        rec.functions[0].units[0].start_line = 9;
        rec.functions[0].units[0].end_line = 3;
        assert!(tree.add_record(rec).is_err());
    }

    #[test]
    fn given_tree_when_serialized_and_restored_then_totals_survive() {
        let mut tree = CoverageTree::new();
        tree.set_metadata("branch", "main");
        tree.add_record(record("x/y/z", 6, 3)).unwrap();
        tree.add_record(record("x/w", 2, 2)).unwrap();
        tree.recalculate();

        let json = serde_json::to_string(&tree).unwrap();
        let restored: CoverageTree = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.summary(), tree.summary());
        assert_eq!(restored.get_metadata("branch"), Some("main"));
        assert_eq!(restored.directory("x").unwrap().total_lines, 8);
        assert_eq!(placed(&restored.directory("x/y").unwrap().packages), vec!["x/y/z"]);
    }
}
