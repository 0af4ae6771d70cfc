//! OpenShift Operations
//!
//! `OcClient` drives the `oc` CLI on a master node through a
//! [`CommandRunner`]. Operations are split by concern:
//! - resources: create/get/delete/patch and simple queries
//! - wait: polling call sites built on [`Waiter`](crate::waiter::Waiter)
//! - events: event filters and records
//! - manifest: JSON documents for `oc create -f -`
//! - parse: pure parsers over `oc` output

pub mod events;
pub mod manifest;
pub mod parse;
pub mod resources;
pub mod wait;

pub use events::{Event, EventFilter};
pub use parse::{GlusterPodLocation, PodReadiness, PodSummary, PvcSizes, VolumeNames};
pub use resources::CreateSource;

use crate::config::{OpsConfig, WaitSettingsTable};
use crate::error::Result;
use crate::remote::{build_runner, CommandOutput, CommandRunner};
use tracing::error;

/// Client for `oc` operations on one master node
pub struct OcClient<R: CommandRunner> {
    runner: R,
    host: String,
    waits: WaitSettingsTable,
}

impl<R: CommandRunner> OcClient<R> {
    /// Create a client with default wait budgets
    pub fn new(runner: R, host: impl Into<String>) -> Self {
        Self {
            runner,
            host: host.into(),
            waits: WaitSettingsTable::default(),
        }
    }

    /// Replace the wait budgets
    pub fn with_waits(mut self, waits: WaitSettingsTable) -> Self {
        self.waits = waits;
        self
    }

    /// Master node host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Underlying runner
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Wait budgets in effect
    pub fn waits(&self) -> &WaitSettingsTable {
        &self.waits
    }

    /// Run a command on the master node, returning the raw output
    pub fn run(&self, command: &str) -> Result<CommandOutput> {
        self.runner.run(&self.host, command)
    }

    /// Run a command and return stdout; nonzero exit is logged and returned as an error
    pub fn run_checked(&self, command: &str) -> Result<String> {
        let output = self.run(command)?;
        if !output.success() {
            error!(
                host = %self.host,
                command,
                exit_code = output.exit_code,
                stderr = %output.stderr.trim(),
                "Command failed"
            );
        }
        output.into_stdout(command)
    }
}

impl OcClient<Box<dyn CommandRunner>> {
    /// Create a client from configuration
    pub fn from_config(config: &OpsConfig) -> Self {
        OcClient::new(build_runner(&config.runner), config.master_node.clone())
            .with_waits(config.waits.clone())
    }
}
