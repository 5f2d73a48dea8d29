//! CLI error type.

use std::io;

use framestream::config::ConfigError;
use framestream::logging::LoggingError;
use framestream::pipeline::PipelineError;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid arguments or settings.
    #[error("{0}")]
    Config(String),

    /// The configuration file could not be loaded or saved.
    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    /// Logging could not be initialized.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// The async runtime could not be built.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] io::Error),

    /// The input file is missing or unreadable.
    #[error("{0}")]
    Input(String),

    /// The report pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Pipeline(PipelineError::Cancelled) => 130,
            CliError::Pipeline(_) => 2,
            _ => 1,
        }
    }
}
