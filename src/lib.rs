//! CNS OpenShift Operations
//!
//! Test-automation plumbing for OpenShift clusters backed by Gluster
//! storage. Cluster state is driven and observed through the `oc`,
//! `gluster`, `gluster-block` and `heketi-cli` command-line tools on a
//! master node, and every "wait until" operation is built on one bounded
//! retry primitive, the [`Waiter`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        ocp-ops (CLI)                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────┐   ┌─────────────────────────┐  │
//! │  │        OcClient          │   │       GlusterOps        │  │
//! │  │ resources / wait / events│◄──┤ volume / status / block │  │
//! │  └────────────┬─────────────┘   └─────────────────────────┘  │
//! │               │                                              │
//! │     ┌─────────┴─────────┐        ┌─────────────────────┐     │
//! │     │   CommandRunner   │        │       Waiter        │     │
//! │     │ local / ssh / mock│        │ timeout + interval  │     │
//! │     └───────────────────┘        └─────────────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`waiter`]: bounded retry iterator with a pluggable clock
//! - [`remote`]: command execution on the master node
//! - [`ocp`]: `oc` operations and polling call sites
//! - [`gluster`]: Gluster volume, brick and block-volume queries
//! - [`config`]: wait budgets and runner selection
//! - [`error`]: Error types and handling

pub mod config;
pub mod error;
pub mod gluster;
pub mod ocp;
pub mod remote;
pub mod waiter;

// Re-export commonly used types
pub use config::{OpsConfig, WaitSettings, WaitSettingsTable};

pub use error::{Error, Result};

pub use gluster::{BlockVolumeInfo, Brick, BrickStatus, GlusterOps, VolumeInfo};

pub use ocp::{CreateSource, Event, EventFilter, OcClient};

pub use remote::{
    build_runner, CommandOutput, CommandRunner, LocalRunner, MockRunner, RunnerKind, SshConfig,
    SshRunner,
};

pub use waiter::{Clock, ManualClock, SystemClock, Tick, Waiter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
