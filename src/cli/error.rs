//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        CliError::from(ApplicationError::Domain(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => crate::exitcode::USAGE,
            CliError::NotFound(_) => crate::exitcode::NOINPUT,
            CliError::Output(_) => crate::exitcode::SOFTWARE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Application(e) => match e {
                    ApplicationError::Domain(DomainError::InvalidPattern { .. }) => {
                        crate::exitcode::USAGE
                    }
                    ApplicationError::Domain(DomainError::InvalidRecord { .. }) => {
                        crate::exitcode::DATAERR
                    }
                    ApplicationError::NoDataFound { .. } => crate::exitcode::NOINPUT,
                    ApplicationError::AllDecodesFailed { .. } => crate::exitcode::DATAERR,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::Cancelled { .. } => crate::exitcode::SOFTWARE,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn given_load_outcomes_when_mapping_exit_codes_then_follow_sysexits() {
        let no_data = CliError::from(ApplicationError::NoDataFound {
            root: PathBuf::from("cov"),
        });
        let all_failed = CliError::from(ApplicationError::AllDecodesFailed {
            root: PathBuf::from("cov"),
            attempted: 3,
        });
        let bad_glob = CliError::from(DomainError::InvalidPattern {
            pattern: "a/[".into(),
            message: "unclosed character class".into(),
        });

        assert_eq!(no_data.exit_code(), crate::exitcode::NOINPUT);
        assert_eq!(all_failed.exit_code(), crate::exitcode::DATAERR);
        assert_eq!(bad_glob.exit_code(), crate::exitcode::USAGE);
    }
}
