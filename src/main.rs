//! ocp-ops
//!
//! Command-line front end over [`OcClient`] for driving an OpenShift
//! cluster with Gluster storage from a shell or CI job.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cns_ocp_ops::{CommandRunner, EventFilter, OcClient, OpsConfig, RunnerKind, WaitSettings};

// =============================================================================
// CLI Arguments
// =============================================================================

/// OpenShift/Gluster operations with bounded waits
#[derive(Parser, Debug)]
#[command(name = "ocp-ops", author, version, about, long_about = None)]
struct Args {
    /// Master node on which `oc` commands run
    #[arg(long, env = "OCP_MASTER")]
    master: Option<String>,

    /// YAML configuration file
    #[arg(long, env = "OCP_OPS_CONFIG")]
    config: Option<PathBuf>,

    /// User for ssh connections to the master node
    #[arg(long, env = "OCP_SSH_USER")]
    ssh_user: Option<String>,

    /// Run `oc` on this machine instead of over ssh
    #[arg(long, env = "OCP_LOCAL")]
    local: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the configured wait budget of one operation
#[derive(ClapArgs, Debug, Clone, Copy)]
struct WaitArgs {
    /// Total budget in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Seconds between probes
    #[arg(long)]
    interval: Option<u64>,
}

impl WaitArgs {
    fn apply(self, mut settings: WaitSettings) -> WaitSettings {
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if let Some(interval) = self.interval {
            settings.interval_secs = interval;
        }
        settings
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List pods of the current project
    Pods,

    /// Print the cluster version
    Version,

    /// Wait until a pod is running and ready
    WaitPodReady {
        pod: String,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Wait until a PVC is bound
    WaitPvcBound {
        pvc: String,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Wait until a resource no longer exists
    WaitAbsent {
        /// Resource type, e.g. `pvc` or `pod`
        kind: String,
        name: String,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// List events, optionally waiting until at least one matches
    Events {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        namespace: Option<String>,
        /// Kind of the involved object
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        reason: Option<String>,
        /// `Normal` or `Warning`
        #[arg(long = "type")]
        event_type: Option<String>,
        /// Poll until a matching event exists
        #[arg(long)]
        wait: bool,
        #[command(flatten)]
        budget: WaitArgs,
    },

    /// Patch the requested size of a PVC and wait for it to converge
    ResizePvc {
        pvc: String,
        /// New size in GiB
        size: u64,
        /// Return right after patching
        #[arg(long)]
        no_verify: bool,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

// =============================================================================
// Main
// =============================================================================

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;
    info!(
        version = cns_ocp_ops::VERSION,
        master = %config.master_node,
        "Starting ocp-ops"
    );

    let oc = OcClient::from_config(&config);
    run(&oc, args.command)
}

fn load_config(args: &Args) -> Result<OpsConfig> {
    let mut config = match &args.config {
        Some(path) => OpsConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => OpsConfig::default(),
    };

    if let Some(master) = &args.master {
        config.master_node = master.clone();
    }
    if args.local {
        config.runner = RunnerKind::Local;
    }
    if let Some(user) = &args.ssh_user {
        match &mut config.runner {
            RunnerKind::Ssh(ssh) => ssh.user = user.clone(),
            RunnerKind::Local => {
                warn!(user = %user, "--ssh-user ignored for the local runner");
            }
        }
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run<R: CommandRunner>(oc: &OcClient<R>, command: Command) -> Result<()> {
    let waits = oc.waits().clone();

    match command {
        Command::Pods => {
            let pods = oc.get_pods().context("listing pods")?;
            println!("{}", serde_json::to_string_pretty(&pods)?);
        }
        Command::Version => {
            println!("{}", oc.version().context("querying cluster version")?);
        }
        Command::WaitPodReady { pod, wait } => {
            oc.wait_for_pod_ready_with(&pod, wait.apply(waits.pod_ready))
                .with_context(|| format!("waiting for pod {}", pod))?;
        }
        Command::WaitPvcBound { pvc, wait } => {
            oc.wait_for_pvc_bound_with(&pvc, wait.apply(waits.pvc_bound))
                .with_context(|| format!("waiting for pvc {}", pvc))?;
        }
        Command::WaitAbsent { kind, name, wait } => {
            oc.wait_for_resource_absence_with(&kind, &name, wait.apply(waits.resource_absence))
                .with_context(|| format!("waiting for {} {} to be deleted", kind, name))?;
        }
        Command::Events {
            name,
            namespace,
            kind,
            reason,
            event_type,
            wait,
            budget,
        } => {
            let filter = EventFilter {
                obj_name: name,
                obj_namespace: namespace,
                obj_type: kind,
                event_reason: reason,
                event_type,
            };
            let events = if wait {
                oc.wait_for_events_with(&filter, budget.apply(waits.events))
            } else {
                oc.get_events(&filter)
            };
            let events = events.context("fetching events")?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::ResizePvc {
            pvc,
            size,
            no_verify,
            wait,
        } => {
            oc.resize_pvc(&pvc, size)
                .with_context(|| format!("resizing pvc {}", pvc))?;
            if !no_verify {
                oc.verify_pvc_size_with(&pvc, size, wait.apply(waits.pvc_size))
                    .with_context(|| format!("verifying size of pvc {}", pvc))?;
                let pv_name = oc.pv_name_for_pvc(&pvc)?;
                oc.verify_pv_size_with(&pv_name, size, wait.apply(waits.pv_size))
                    .with_context(|| format!("verifying size of pv {}", pv_name))?;
            }
        }
    }

    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so command output stays parseable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_args_override() {
        let wait = WaitArgs {
            timeout: Some(30),
            interval: None,
        };
        assert_eq!(wait.apply(WaitSettings::new(120, 3)), WaitSettings::new(30, 3));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from([
            "ocp-ops",
            "--master",
            "m1",
            "--local",
            "wait-pvc-bound",
            "claim1",
            "--timeout",
            "10",
        ])
        .unwrap();
        assert_eq!(args.master.as_deref(), Some("m1"));
        assert!(args.local);
        assert!(matches!(
            args.command,
            Command::WaitPvcBound { ref pvc, wait } if pvc == "claim1" && wait.timeout == Some(10)
        ));
    }

    #[test]
    fn test_load_config_overrides() {
        let args = Args::try_parse_from([
            "ocp-ops", "--master", "m1", "--ssh-user", "cloud-user", "pods",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.master_node, "m1");
        match config.runner {
            RunnerKind::Ssh(ssh) => assert_eq!(ssh.user, "cloud-user"),
            RunnerKind::Local => panic!("expected ssh runner"),
        }
    }
}
