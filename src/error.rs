//! Error types for OpenShift / Gluster operations
//!
//! Provides structured error types for the retry driver, remote command
//! execution, output parsing, and the polling call sites built on top.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Argument / Configuration Errors
    // =========================================================================
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Remote Execution Errors
    // =========================================================================
    #[error("Command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    // =========================================================================
    // Polling Errors
    // =========================================================================
    #[error("{operation} did not complete within {}s", timeout.as_secs_f64())]
    Timeout { operation: String, timeout: Duration },

    // =========================================================================
    // Cluster State Errors
    // =========================================================================
    #[error("Unexpected output from `{command}`: {reason}: {output:?}")]
    UnexpectedOutput {
        command: String,
        output: String,
        reason: String,
    },

    #[error("{kind} '{name}' is in unexpected state: {state}")]
    ResourceState {
        kind: String,
        name: String,
        state: String,
    },

    #[error("Verification failed: {0}")]
    Verification(String),

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `Timeout` error for a named operation
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Build an `UnexpectedOutput` error
    pub fn unexpected_output(
        command: impl Into<String>,
        output: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::UnexpectedOutput {
            command: command.into(),
            output: output.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is transient.
    ///
    /// Polling call sites that retry through probe failures consult this
    /// before giving up on an attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::CommandFailed { .. } | Error::Io(_))
    }

    /// Check if this error came from an exhausted wait
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
