//! Shared command setup.
//!
//! Every command that touches the pipeline goes through [`CliRunner`], which
//! loads `config.ini`, installs logging and owns the tokio runtime.

use std::future::Future;

use framestream::config::ConfigFile;
use framestream::logging::{init_logging, LoggingConfig, LoggingGuard};
use tokio::runtime::Runtime;
use tracing::info;

use crate::error::CliError;

/// Holds the loaded configuration, the runtime and the logging guard.
pub struct CliRunner {
    config: ConfigFile,
    runtime: Runtime,
    // Declared last so the file writer outlives the runtime.
    _logging: LoggingGuard,
}

impl CliRunner {
    /// Load configuration, initialize logging and build the runtime.
    pub fn new(verbose: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_config = LoggingConfig::from_settings(&config.logging).with_verbose(verbose);
        let logging = init_logging(&logging_config)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("framestream")
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            config,
            runtime,
            _logging: logging,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(version = framestream::VERSION, command, "framestream starting");
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}
