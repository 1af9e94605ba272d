//! Decoded pod records, the input of tree construction.
//!
//! A decoder turns one capture location into one or more [`DecodedPod`]s;
//! each package record is handed to [`CoverageTree::add_record`].
//!
//! [`CoverageTree::add_record`]: crate::domain::CoverageTree::add_record

use serde::{Deserialize, Serialize};

use crate::domain::entities::Metadata;

/// One coherent capture: a meta description plus its counter observations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedPod {
    /// Identifier of the meta artifact (its content hash)
    pub meta_hash: String,
    pub packages: Vec<DecodedPackage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodedPackage {
    pub import_path: String,
    #[serde(default)]
    pub module_path: String,
    /// Display name; empty means "derive from the import path"
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub functions: Vec<DecodedFunction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodedFunction {
    pub name: String,
    pub file: String,
    #[serde(default, alias = "literal")]
    pub is_literal: bool,
    #[serde(default)]
    pub units: Vec<DecodedUnit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecodedUnit {
    pub start_line: u32,
    #[serde(default)]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(default)]
    pub end_col: u32,
    #[serde(default)]
    pub count: u64,
}
