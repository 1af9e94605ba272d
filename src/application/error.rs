//! Application-level errors (wraps domain errors)

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add load-level outcomes.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no coverage data found under {root}")]
    NoDataFound { root: PathBuf },

    #[error(
        "found {attempted} coverage location(s) under {root} but none could be decoded \
         (format or version mismatch?)"
    )]
    AllDecodesFailed { root: PathBuf, attempted: usize },

    #[error("load of {root} cancelled")]
    Cancelled { root: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
