//! SSH Runner
//!
//! Runs commands on a remote host with the system `ssh` client.

use super::{CommandOutput, CommandRunner};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::process::Command;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the ssh runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Remote login user
    pub user: String,
    /// Remote ssh port
    pub port: u16,
    /// Extra `-o` options passed to ssh
    pub options: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            options: vec![
                "BatchMode=yes".to_string(),
                "StrictHostKeyChecking=no".to_string(),
            ],
        }
    }
}

// =============================================================================
// SSH Runner
// =============================================================================

/// Runner that executes commands over ssh
#[derive(Debug, Clone, Default)]
pub struct SshRunner {
    config: SshConfig,
}

impl SshRunner {
    /// Create a new ssh runner
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the `ssh` binary for one invocation
    pub fn ssh_args(&self, host: &str, command: &str) -> Vec<String> {
        let mut args = vec!["-p".to_string(), self.config.port.to_string()];
        for option in &self.config.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }
        args.push(format!("{}@{}", self.config.user, host));
        args.push(command.to_string());
        args
    }
}

impl CommandRunner for SshRunner {
    fn run(&self, host: &str, command: &str) -> Result<CommandOutput> {
        debug!(host, user = %self.config.user, command, "Running remote command");
        let output = Command::new("ssh")
            .args(self.ssh_args(host, command))
            .output()?;
        Ok(output.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_args() {
        let runner = SshRunner::new(SshConfig {
            user: "cloud-user".into(),
            port: 2222,
            options: vec!["BatchMode=yes".into()],
        });
        assert_eq!(
            runner.ssh_args("master.example.com", "oc get pods"),
            vec![
                "-p",
                "2222",
                "-o",
                "BatchMode=yes",
                "cloud-user@master.example.com",
                "oc get pods",
            ]
        );
    }

    #[test]
    fn test_default_config() {
        let config = SshConfig::default();
        assert_eq!(config.user, "root");
        assert_eq!(config.port, 22);
        assert!(config.options.iter().any(|o| o == "BatchMode=yes"));
    }
}
