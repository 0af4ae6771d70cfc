//! Configuration
//!
//! `OpsConfig` names the master node commands run on, the runner used to
//! reach it, and the time budgets of every polling operation. It can be
//! loaded from YAML and is overridden from the command line by the binary.

use crate::error::{Error, Result};
use crate::remote::RunnerKind;
use crate::waiter::Waiter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Wait Settings
// =============================================================================

/// Time budget of one polling operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Total budget in seconds
    pub timeout_secs: u64,
    /// Sleep between probes in seconds
    pub interval_secs: u64,
}

impl WaitSettings {
    pub const fn new(timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            timeout_secs,
            interval_secs,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Start a fresh retry session with these settings
    pub fn waiter(&self) -> Waiter {
        Waiter::new(self.timeout(), self.interval())
    }
}

/// Budgets for each polling operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettingsTable {
    pub resource_absence: WaitSettings,
    pub pod_ready: WaitSettings,
    pub dc_pod_name: WaitSettings,
    pub pvc_bound: WaitSettings,
    pub pvc_size: WaitSettings,
    pub pv_size: WaitSettings,
    pub events: WaitSettings,
}

impl Default for WaitSettingsTable {
    fn default() -> Self {
        Self {
            resource_absence: WaitSettings::new(120, 10),
            pod_ready: WaitSettings::new(1200, 60),
            dc_pod_name: WaitSettings::new(1200, 60),
            pvc_bound: WaitSettings::new(120, 3),
            pvc_size: WaitSettings::new(120, 5),
            pv_size: WaitSettings::new(120, 5),
            events: WaitSettings::new(120, 3),
        }
    }
}

// =============================================================================
// Ops Configuration
// =============================================================================

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    /// Host on which `oc` commands are executed
    pub master_node: String,
    /// How commands reach the master node
    pub runner: RunnerKind,
    /// Polling budgets
    pub waits: WaitSettingsTable,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            master_node: "localhost".to_string(),
            runner: RunnerKind::default(),
            waits: WaitSettingsTable::default(),
        }
    }
}

impl OpsConfig {
    /// Parse configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: OpsConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Reject configurations that cannot drive a cluster
    pub fn validate(&self) -> Result<()> {
        if self.master_node.trim().is_empty() {
            return Err(Error::Configuration("master_node must not be empty".into()));
        }
        Ok(())
    }
}
