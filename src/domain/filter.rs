//! Package queries: path pattern, coverage thresholds and metadata.
//!
//! All clauses are optional and combine by conjunction. There is no OR and
//! no negation at this layer; callers compose several queries for that.

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Metadata, Package};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::CoverageTree;

/// Query over the packages of a tree.
///
/// Thresholds carry explicit presence: `min_coverage: Some(0.0)` is a real
/// lower bound, `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageFilter {
    /// Glob over the full import path (`*`, `?`, `[...]`)
    pub package_pattern: Option<String>,
    /// Inclusive lower bound on the coverage rate
    pub min_coverage: Option<f64>,
    /// Inclusive upper bound on the coverage rate
    pub max_coverage: Option<f64>,
    /// Required metadata; values may contain globs
    #[serde(default)]
    pub metadata: Metadata,
}

impl PackageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.package_pattern = Some(pattern.into());
        self
    }

    pub fn with_min_coverage(mut self, rate: f64) -> Self {
        self.min_coverage = Some(rate);
        self
    }

    pub fn with_max_coverage(mut self, rate: f64) -> Self {
        self.max_coverage = Some(rate);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Compiles every pattern, failing on the first malformed one.
    pub fn compile(&self) -> DomainResult<PackageMatcher> {
        let pattern = self.package_pattern.as_deref().map(compile_glob).transpose()?;
        let metadata = self
            .metadata
            .iter()
            .map(|(key, value)| Ok((key.clone(), compile_glob(value)?)))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PackageMatcher {
            pattern,
            min_coverage: self.min_coverage,
            max_coverage: self.max_coverage,
            metadata,
        })
    }
}

/// Compiled form of a [`PackageFilter`].
#[derive(Debug, Clone)]
pub struct PackageMatcher {
    pattern: Option<GlobMatcher>,
    min_coverage: Option<f64>,
    max_coverage: Option<f64>,
    metadata: Vec<(String, GlobMatcher)>,
}

impl PackageMatcher {
    pub fn matches(&self, package: &Package) -> bool {
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&package.import_path) {
                return false;
            }
        }
        if let Some(min) = self.min_coverage {
            if package.coverage_rate < min {
                return false;
            }
        }
        if let Some(max) = self.max_coverage {
            if package.coverage_rate > max {
                return false;
            }
        }
        self.metadata.iter().all(|(key, expected)| {
            package
                .metadata(key)
                .is_some_and(|actual| expected.is_match(actual))
        })
    }
}

/// Glob where `*` and `?` stop at `/`.
pub fn compile_glob(pattern: &str) -> DomainResult<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| DomainError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })
}

impl CoverageTree {
    /// Packages matching every clause of `filter`, sorted by import path.
    pub fn filter_packages(&self, filter: &PackageFilter) -> DomainResult<Vec<&Package>> {
        let matcher = filter.compile()?;
        Ok(self.packages().filter(|p| matcher.matches(p)).collect())
    }
}
