//! Result and error types for covgate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for covgate operations
pub type CovgateResult<T> = Result<T, CovgateError>;

/// Errors that can occur in covgate
#[derive(Debug, Error)]
pub enum CovgateError {
    /// Fatal misconfiguration (missing code-transform step, bad threshold,
    /// unknown report format). Aborts the host command.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// The test run produced no coverage payload
    #[error("No coverage data: {message}")]
    MissingCoverage {
        /// Error message
        message: String,
    },

    /// A structured report could not be written
    #[error("Failed to write {format} report to {}: {source}", path.display())]
    ReportWrite {
        /// Report format identifier
        format: String,
        /// Target file
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Coverage payload could not be decoded
    #[error("Invalid coverage payload: {message}")]
    InvalidPayload {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CovgateError {
    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing-coverage error
    #[must_use]
    pub fn missing_coverage(message: impl Into<String>) -> Self {
        Self::MissingCoverage {
            message: message.into(),
        }
    }

    /// Create an invalid-payload error
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Whether the error must abort the host command
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::MissingCoverage { .. } | Self::ReportWrite { .. }
        )
    }
}
