//! `gluster volume info` Parser
//!
//! Parses the plain-text form of `gluster volume info [<vol>]`, which lists
//! one `Key: Value` block per volume separated by blank lines.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Records
// =============================================================================

/// One brick of a volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brick {
    /// `host:/path` as printed by gluster
    pub name: String,
}

impl Brick {
    /// Host (name or IP) part of the brick
    pub fn host(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }

    /// Export path part of the brick
    pub fn path(&self) -> &str {
        self.name.split_once(':').map(|(_, p)| p).unwrap_or("")
    }
}

/// A gluster volume as described by `gluster volume info`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub name: String,
    pub volume_type: String,
    pub id: String,
    pub status: String,
    /// Total brick count (`1 x 3 = 3` yields 3)
    pub brick_count: u32,
    pub transport: String,
    pub bricks: Vec<Brick>,
    /// `Options Reconfigured` section
    pub options: BTreeMap<String, String>,
}

impl VolumeInfo {
    /// Unique brick hosts, in brick order
    pub fn brick_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for brick in &self.bricks {
            let host = brick.host();
            if !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
        hosts
    }
}

// =============================================================================
// Parser
// =============================================================================

#[derive(PartialEq)]
enum Section {
    Header,
    Bricks,
    Options,
}

fn parse_brick_count(value: &str) -> Option<u32> {
    value
        .rsplit('=')
        .next()
        .and_then(|total| total.trim().parse().ok())
}

/// Parse every volume in `gluster volume info` output
pub fn parse_volume_info(output: &str) -> Result<Vec<VolumeInfo>> {
    let mut volumes = Vec::new();
    let mut current: Option<VolumeInfo> = None;
    let mut section = Section::Header;

    for raw in output.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("Volume") && line.contains("does not exist") {
            return Err(Error::unexpected_output(
                "gluster volume info",
                output,
                "volume does not exist",
            ));
        }

        let (key, value) = match line.split_once(':') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => continue,
        };

        if key == "Volume Name" {
            if let Some(volume) = current.take() {
                volumes.push(volume);
            }
            current = Some(VolumeInfo {
                name: value.to_string(),
                ..Default::default()
            });
            section = Section::Header;
            continue;
        }

        let volume = match current.as_mut() {
            Some(v) => v,
            None => continue,
        };

        match key {
            "Bricks" => section = Section::Bricks,
            "Options Reconfigured" => section = Section::Options,
            "Type" => volume.volume_type = value.to_string(),
            "Volume ID" => volume.id = value.to_string(),
            "Status" => volume.status = value.to_string(),
            "Number of Bricks" => volume.brick_count = parse_brick_count(value).unwrap_or(0),
            "Transport-type" => volume.transport = value.to_string(),
            k if section == Section::Bricks && k.starts_with("Brick") => {
                volume.bricks.push(Brick {
                    name: value.to_string(),
                });
            }
            k if section == Section::Options => {
                volume.options.insert(k.to_string(), value.to_string());
            }
            _ => {}
        }
    }

    if let Some(volume) = current.take() {
        volumes.push(volume);
    }
    Ok(volumes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const VOLUME_INFO: &str = "
Volume Name: vol_7a1c
Type: Replicate
Volume ID: 5e2bd7a4-0b1a-4d6e-9f1e-8e7f1e2f3a4b
Status: Started
Snapshot Count: 0
Number of Bricks: 1 x 3 = 3
Transport-type: tcp
Bricks:
Brick1: 10.70.46.11:/var/lib/heketi/mounts/vg_1/brick_a/brick
Brick2: 10.70.46.12:/var/lib/heketi/mounts/vg_2/brick_b/brick
Brick3: 10.70.46.13:/var/lib/heketi/mounts/vg_3/brick_c/brick
Options Reconfigured:
transport.address-family: inet
performance.readdir-ahead: on

Volume Name: heketidbstorage
Type: Distribute
Volume ID: 0c1d
Status: Stopped
Number of Bricks: 1
Transport-type: tcp
Bricks:
Brick1: 10.70.46.11:/bricks/db
";

    #[test]
    fn test_parse_volume_info() {
        let volumes = parse_volume_info(VOLUME_INFO).unwrap();
        assert_eq!(volumes.len(), 2);

        let vol = &volumes[0];
        assert_eq!(vol.name, "vol_7a1c");
        assert_eq!(vol.volume_type, "Replicate");
        assert_eq!(vol.status, "Started");
        assert_eq!(vol.brick_count, 3);
        assert_eq!(vol.bricks.len(), 3);
        assert_eq!(vol.bricks[1].host(), "10.70.46.12");
        assert_eq!(vol.bricks[1].path(), "/var/lib/heketi/mounts/vg_2/brick_b/brick");
        assert_eq!(vol.options["performance.readdir-ahead"], "on");
        assert_eq!(
            vol.brick_hosts(),
            vec!["10.70.46.11", "10.70.46.12", "10.70.46.13"]
        );

        let db = &volumes[1];
        assert_eq!(db.brick_count, 1);
        assert_eq!(db.status, "Stopped");
        assert!(db.options.is_empty());
    }

    #[test]
    fn test_missing_volume() {
        assert_matches!(
            parse_volume_info("Volume vol_x does not exist\n"),
            Err(Error::UnexpectedOutput { .. })
        );
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_volume_info("No volumes present\n").unwrap().is_empty());
    }
}
