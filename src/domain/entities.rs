//! Domain entities: core data structures

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form string metadata attached to trees and packages.
///
/// Keys are open-ended; see [`keys`] for the ones the tooling understands.
pub type Metadata = BTreeMap<String, String>;

/// Well-known metadata keys. Convention, not schema.
pub mod keys {
    /// Test or test suite that produced the capture
    pub const TEST: &str = "test";
    /// Module the package belongs to
    pub const MODULE: &str = "module";
    /// Environment the run executed in (ci, local, staging, ...)
    pub const ENVIRONMENT: &str = "environment";
    /// Host the coverage was loaded on
    pub const MACHINE: &str = "machine";
    /// Source repository
    pub const REPOSITORY: &str = "repository";
    /// Source branch
    pub const BRANCH: &str = "branch";
    /// RFC 3339 timestamp of the load
    pub const LOADED_AT: &str = "loaded_at";
}

/// Covered/total ratio, 0.0 for an empty span.
pub fn coverage_rate(covered_lines: u64, total_lines: u64) -> f64 {
    if total_lines == 0 {
        0.0
    } else {
        covered_lines as f64 / total_lines as f64
    }
}

/// Smallest trackable span of source (a basic block).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverableUnit {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    /// Execution count
    pub count: u64,
}

impl CoverableUnit {
    pub fn covered(&self) -> bool {
        self.count > 0
    }

    /// Lines spanned by this unit, inclusive on both ends.
    pub fn total_lines(&self) -> u64 {
        u64::from(self.end_line.saturating_sub(self.start_line)) + 1
    }

    /// Units are never fractionally covered.
    pub fn covered_lines(&self) -> u64 {
        if self.covered() {
            self.total_lines()
        } else {
            0
        }
    }
}

/// Function (or function literal) declared in a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    /// Declaring source file
    pub file: String,
    /// Anonymous function / closure
    #[serde(default)]
    pub is_literal: bool,
    pub units: Vec<CoverableUnit>,
    #[serde(default)]
    pub total_lines: u64,
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub coverage_rate: f64,
}

impl Function {
    pub(crate) fn recalculate(&mut self) {
        self.total_lines = self.units.iter().map(CoverableUnit::total_lines).sum();
        self.covered_lines = self.units.iter().map(CoverableUnit::covered_lines).sum();
        self.coverage_rate = coverage_rate(self.covered_lines, self.total_lines);
    }
}

/// Package identified by its import path, the merge key of a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub import_path: String,
    pub module_path: String,
    /// Human-readable name, defaults to the last import path segment
    pub name: String,
    pub functions: Vec<Function>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub total_lines: u64,
    #[serde(default)]
    pub covered_lines: u64,
    #[serde(default)]
    pub coverage_rate: f64,
}

impl Package {
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Look up a function by declaring file and name.
    pub fn function(&self, file: &str, name: &str) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.file == file && f.name == name)
    }

    /// Rolls units up into functions, then functions into the package.
    pub(crate) fn recalculate(&mut self) {
        let mut total = 0;
        let mut covered = 0;
        for function in &mut self.functions {
            function.recalculate();
            total += function.total_lines;
            covered += function.covered_lines;
        }
        self.total_lines = total;
        self.covered_lines = covered;
        self.coverage_rate = coverage_rate(covered, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(start: u32, end: u32, count: u64) -> CoverableUnit {
        CoverableUnit {
            start_line: start,
            start_col: 1,
            end_line: end,
            end_col: 10,
            count,
        }
    }

    #[test]
    fn given_uncovered_unit_when_counting_lines_then_contributes_no_covered_lines() {
        let u = unit(3, 7, 0);
        assert!(!u.covered());
        assert_eq!(u.total_lines(), 5);
        assert_eq!(u.covered_lines(), 0);
    }

    #[test]
    fn given_single_line_unit_when_covered_then_counts_one_line() {
        let u = unit(4, 4, 12);
        assert_eq!(u.total_lines(), 1);
        assert_eq!(u.covered_lines(), 1);
    }

    #[test]
    fn given_function_without_units_when_recalculating_then_rate_is_zero() {
        let mut f = Function {
            name: "init".into(),
            file: "a.go".into(),
            is_literal: false,
            units: vec![],
            total_lines: 99,
            covered_lines: 99,
            coverage_rate: 1.0,
        };
        f.recalculate();
        assert_eq!(f.total_lines, 0);
        assert_eq!(f.covered_lines, 0);
        assert_eq!(f.coverage_rate, 0.0);
    }

    #[test]
    fn given_package_when_recalculating_then_sums_functions() {
        let mut pkg = Package {
            import_path: "x/y".into(),
            module_path: "x".into(),
            name: "y".into(),
            functions: vec![
                Function {
                    name: "A".into(),
                    file: "y.go".into(),
                    is_literal: false,
                    units: vec![unit(1, 4, 1), unit(5, 6, 0)],
                    total_lines: 0,
                    covered_lines: 0,
                    coverage_rate: 0.0,
                },
                Function {
                    name: "func1".into(),
                    file: "y.go".into(),
                    is_literal: true,
                    units: vec![unit(10, 13, 2)],
                    total_lines: 0,
                    covered_lines: 0,
                    coverage_rate: 0.0,
                },
            ],
            metadata: Metadata::new(),
            total_lines: 0,
            covered_lines: 0,
            coverage_rate: 0.0,
        };

        pkg.recalculate();

        assert_eq!(pkg.functions[0].total_lines, 6);
        assert_eq!(pkg.functions[0].covered_lines, 4);
        assert_eq!(pkg.total_lines, 10);
        assert_eq!(pkg.covered_lines, 8);
        assert!((pkg.coverage_rate - 0.8).abs() < f64::EPSILON);
        assert!(pkg.function("y.go", "func1").is_some_and(|f| f.is_literal));
    }

    #[test]
    fn test_coverage_rate_zero_total() {
        assert_eq!(coverage_rate(0, 0), 0.0);
    }
}
