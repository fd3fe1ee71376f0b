//! Error types for the driver.

use std::time::Duration;

use kmp_protocol::ProtocolError;
use thiserror::Error;

/// Why a register read produced no value.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No terminator arrived within the response window.
    #[error("timed out after {elapsed:?} waiting for response ({received} bytes received)")]
    Timeout {
        /// Time spent listening.
        elapsed: Duration,
        /// Raw bytes received before giving up.
        received: usize,
    },

    /// The response could not be decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The link itself failed.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Stable snake_case name of the error, used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            DriverError::Timeout { .. } => "timeout",
            DriverError::Protocol(err) => err.kind(),
            DriverError::Io(_) => "io",
        }
    }

    /// Returns true for a response timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DriverError::Timeout { .. })
    }
}

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;
