//! Aggregate statistics over packages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{coverage_rate, Package};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub package_count: usize,
    pub total_lines: u64,
    pub covered_lines: u64,
    pub coverage_rate: f64,
}

impl CoverageSummary {
    /// Plain sums over the given packages.
    pub fn from_packages<'a>(packages: impl IntoIterator<Item = &'a Package>) -> Self {
        let mut summary = Self::default();
        for package in packages {
            summary.package_count += 1;
            summary.total_lines += package.total_lines;
            summary.covered_lines += package.covered_lines;
        }
        summary.coverage_rate = coverage_rate(summary.covered_lines, summary.total_lines);
        summary
    }

    pub fn coverage_percent(&self) -> f64 {
        self.coverage_rate * 100.0
    }
}

impl fmt::Display for CoverageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packages, {}/{} lines covered ({:.1}%)",
            self.package_count,
            self.covered_lines,
            self.total_lines,
            self.coverage_percent()
        )
    }
}
