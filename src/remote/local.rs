//! Local Runner
//!
//! Runs commands on the current machine through `sh -c`. Used when the
//! harness itself has a logged-in `oc` client.

use super::{CommandOutput, CommandRunner};
use crate::error::Result;
use std::process::Command;
use tracing::debug;

/// Runner that spawns `sh -c <cmd>` and ignores the host name
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRunner;

impl CommandRunner for LocalRunner {
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        debug!(host, command, "Running local command");
        let output = Command::new("sh").arg("-c").arg(command).output()?;
        Ok(output.into())
    }
}
