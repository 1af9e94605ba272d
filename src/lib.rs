//! covtree: merge scattered per-run coverage captures into one queryable
//! directory/package/function tree.
//!
//! Layers, innermost first:
//! - [`domain`]: tree, filter and forest, no I/O
//! - [`application`]: loader and forest persistence over I/O traits
//! - [`infrastructure`]: filesystem, discovery, decoding, DI container
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
