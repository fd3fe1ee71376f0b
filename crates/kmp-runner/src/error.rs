//! Error types for the runner.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop the poller from starting or running.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid YAML for this schema.
    #[error("failed to parse config: {0}")]
    ParseConfig(#[from] serde_yaml::Error),

    /// A duration string could not be parsed.
    #[error("invalid interval {0:?}: expected <n>ms, <n>s, <n>m or <n>h")]
    InvalidInterval(String),

    /// The config parsed but makes no sense.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The serial port could not be opened.
    #[error("failed to open serial port {port}: {source}")]
    OpenPort {
        /// Port path or name.
        port: String,
        /// Underlying error.
        #[source]
        source: serialport::Error,
    },

    /// The Ctrl-C handler could not be installed.
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    /// Metrics exporter failed to start.
    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),
}

impl RunnerError {
    /// Create an [`RunnerError::InvalidConfig`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        RunnerError::InvalidConfig(msg.into())
    }
}

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;
