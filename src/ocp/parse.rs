//! `oc` Output Parsers
//!
//! Pure functions over the textual output of `oc` commands. The wide pod
//! listing is scraped because ready/status/restarts are computed by the
//! client-side printer and are not present in the YAML form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Records
// =============================================================================

/// One row of `oc get -o wide pods`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSummary {
    /// Ready containers, e.g. `1/1`
    pub ready: String,
    /// Printed status, e.g. `Running`
    pub status: String,
    /// Restart count as printed
    pub restarts: String,
    /// Age as printed, e.g. `3d`
    pub age: String,
    /// Pod IP
    pub ip: String,
    /// Node the pod is scheduled on
    pub node: String,
}

/// Readiness of the first container plus the pod phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodReadiness {
    pub ready: bool,
    pub phase: String,
}

impl PodReadiness {
    /// Ready container and `Running` phase
    pub fn is_running_and_ready(&self) -> bool {
        self.ready && self.phase == "Running"
    }
}

/// Requested and provisioned PVC capacity in GiB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PvcSizes {
    pub spec_gi: u64,
    pub actual_gi: u64,
}

/// Heketi and Gluster volume names backing a PV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeNames {
    pub heketi_vol: String,
    pub gluster_vol: String,
}

/// Gluster pod and the node it runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlusterPodLocation {
    pub pod_name: String,
    pub host_name: String,
    pub host_ip: String,
}

// =============================================================================
// Parsers
// =============================================================================

/// Parse `oc get -o wide --no-headers=true pods` into rows keyed by pod name.
///
/// Rows that do not have the expected shape are skipped.
pub fn parse_wide_pods(output: &str) -> BTreeMap<String, PodSummary> {
    let mut pods = BTreeMap::new();
    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 7 {
            continue;
        }
        let status_is_word = fields[2].chars().all(|c| c.is_alphanumeric() || c == '_');
        let restarts_is_number = fields[3].chars().all(|c| c.is_ascii_digit());
        if !status_is_word || !restarts_is_number {
            continue;
        }
        pods.insert(
            fields[0].to_string(),
            PodSummary {
                ready: fields[1].to_string(),
                status: fields[2].to_string(),
                restarts: fields[3].to_string(),
                age: fields[4].to_string(),
                ip: fields[5].to_string(),
                node: fields[6].to_string(),
            },
        );
    }
    pods
}

/// Parse `:.status.containerStatuses[0].ready,:.status.phase` custom columns
pub fn parse_pod_readiness(output: &str) -> Option<PodReadiness> {
    let mut fields = output.split_whitespace();
    let ready = fields.next()?;
    let phase = fields.next()?;
    Some(PodReadiness {
        ready: ready == "true",
        phase: phase.to_string(),
    })
}

/// First line of the output, trimmed; empty when there is none
pub fn first_line(output: &str) -> String {
    output.trim().lines().next().unwrap_or("").trim().to_string()
}

/// Trimmed, non-empty lines
pub fn nonempty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a quantity printed as `<n>Gi`
pub fn parse_gi(value: &str) -> Option<u64> {
    value.trim().trim_end_matches("Gi").parse().ok()
}

/// Parse `:.spec.resources.requests.storage,:.status.capacity.storage`
pub fn parse_pvc_sizes(output: &str) -> Option<PvcSizes> {
    let mut fields = output.split_whitespace();
    Some(PvcSizes {
        spec_gi: parse_gi(fields.next()?)?,
        actual_gi: parse_gi(fields.next()?)?,
    })
}

/// Parse the heketi volume id and gluster path columns of a PV
pub fn parse_volume_names(output: &str) -> Option<VolumeNames> {
    let mut fields = output.split_whitespace();
    Some(VolumeNames {
        heketi_vol: fields.next()?.to_string(),
        gluster_vol: fields.next()?.to_string(),
    })
}

/// Extract IPs from `<targetPortal> [<portal>,<portal>]` template output
pub fn parse_iscsi_portals(output: &str) -> Vec<String> {
    output
        .replace(['[', ']', ','], " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Parse `name nodeName hostIP` rows of gluster pods
pub fn parse_gluster_pod_rows(output: &str) -> Option<Vec<GlusterPodLocation>> {
    nonempty_lines(output)
        .iter()
        .map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [pod, host, ip] => Some(GlusterPodLocation {
                    pod_name: pod.to_string(),
                    host_name: host.to_string(),
                    host_ip: ip.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Parse the `glusterBlockShare,volume-id,claimRef` row of a block PV
pub fn parse_block_volume_row(output: &str) -> Option<(String, String)> {
    let fields: Vec<&str> = output.split_whitespace().collect();
    match fields.as_slice() {
        [name, id, _claim] => Some((name.to_string(), id.to_string())),
        _ => None,
    }
}

/// Quote a value for a POSIX shell using single quotes
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
