//! Remote Command Execution
//!
//! Provides the [`CommandRunner`] seam every cluster operation goes through:
//! - Local: runs the command through `sh -c` on this machine
//! - Ssh: runs the command on the target host over `ssh`
//! - Mock: scripted responses for tests

pub mod local;
pub mod mock;
pub mod ssh;

pub use local::*;
pub use mock::*;
pub use ssh::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::process::Output;

// =============================================================================
// Command Output
// =============================================================================

/// Captured result of one remote command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Process exit code (-1 when terminated by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with status 0
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Return stdout, or a `CommandFailed` error on nonzero exit
    pub fn into_stdout(self, command: &str) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(self.into_error(command))
        }
    }

    /// Convert into a `CommandFailed` error regardless of exit code
    pub fn into_error(self, command: &str) -> Error {
        Error::CommandFailed {
            command: command.to_string(),
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

// =============================================================================
// Runner Trait
// =============================================================================

/// Executes shell command strings on a named host
pub trait CommandRunner: Send + Sync {
    /// Run `command` on `host` and capture its output.
    ///
    /// A nonzero exit is not an error at this level; only failing to
    /// launch the command is.
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput>;

    /// Run and return stdout, treating a nonzero exit as an error
    fn run_checked(&self, host: &str, command: &str) -> Result<String> {
        self.run(host, command)?.into_stdout(command)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        (**self).run(host, command)
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        (**self).run(host, command)
    }
}

// =============================================================================
// Runner Selection
// =============================================================================

/// Which runner a client should use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RunnerKind {
    /// Execute on the local machine, ignoring the host name
    Local,
    /// Execute on the host over ssh
    Ssh(SshConfig),
}

impl Default for RunnerKind {
    fn default() -> Self {
        RunnerKind::Ssh(SshConfig::default())
    }
}

/// Build a boxed runner from its configuration
pub fn build_runner(kind: &RunnerKind) -> Box<dyn CommandRunner> {
    match kind {
        RunnerKind::Local => Box::new(LocalRunner),
        RunnerKind::Ssh(config) => Box::new(SshRunner::new(config.clone())),
    }
}
