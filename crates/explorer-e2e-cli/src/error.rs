//! Error types for the CLI

use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that stop the CLI before or after a run
///
/// Failing cases are not errors; they are verdicts in the run report.
#[derive(Debug, Error)]
pub enum CliError {
    /// Resolved settings no run could use
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
    },

    /// The async runtime could not start
    #[error("Cannot start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Harness setup failed (browser launch, duplicate suites)
    #[error("Harness error: {0}")]
    Harness(#[from] explorer_e2e::HarnessError),

    /// The run finished but its report could not be written
    #[error("Cannot write report to {}: {source}", path.display())]
    Report {
        /// Requested report path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: explorer_e2e::HarnessError,
    },
}

impl CliError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a report error for `path`
    #[must_use]
    pub fn report(path: impl Into<PathBuf>, source: explorer_e2e::HarnessError) -> Self {
        Self::Report {
            path: path.into(),
            source,
        }
    }
}
