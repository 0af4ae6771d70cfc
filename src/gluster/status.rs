//! `gluster volume status` Parser
//!
//! Extracts brick rows from the tabular output of
//! `gluster volume status <vol>`. Long brick paths are wrapped by gluster
//! onto a second line, which is joined back before splitting columns.

use serde::{Deserialize, Serialize};

/// Runtime status of one brick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickStatus {
    /// `host:/path`
    pub brick: String,
    pub tcp_port: Option<u16>,
    pub online: bool,
    pub pid: Option<u32>,
}

/// Columns after the brick name: TCP Port, RDMA Port, Online, Pid
const TRAILING_COLUMNS: usize = 4;

fn brick_row(tokens: &[&str]) -> Option<BrickStatus> {
    if tokens.len() != TRAILING_COLUMNS + 1 {
        return None;
    }
    let online = match tokens[3] {
        "Y" => true,
        "N" => false,
        _ => return None,
    };
    Some(BrickStatus {
        brick: tokens[0].to_string(),
        tcp_port: tokens[1].parse().ok(),
        online,
        pid: tokens[4].parse().ok(),
    })
}

/// Parse the brick rows of `gluster volume status` output
pub fn parse_volume_status(output: &str) -> Vec<BrickStatus> {
    let mut bricks = Vec::new();
    let mut pending: Option<String> = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if let Some(prefix) = pending.take() {
            let joined = format!("{}{}", prefix, trimmed);
            let tokens: Vec<&str> = joined.split_whitespace().collect();
            if let Some(row) = brick_row(&tokens) {
                bricks.push(row);
            }
            continue;
        }

        let rest = match trimmed.strip_prefix("Brick ") {
            Some(rest) => rest,
            None => continue,
        };
        let tokens: Vec<&str> = rest.split_whitespace().collect();
        if tokens.len() == 1 {
            // Brick path continues on the next line
            pending = Some(tokens[0].to_string());
        } else if let Some(row) = brick_row(&tokens) {
            bricks.push(row);
        }
    }

    bricks
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "\
Status of volume: vol_7a1c
Gluster process                             TCP Port  RDMA Port  Online  Pid
------------------------------------------------------------------------------
Brick 10.70.46.11:/var/lib/heketi/mounts/vg
_1/brick_a/brick                            49152     0          Y       1311
Brick 10.70.46.12:/bricks/b                 49153     0          Y       1422
Brick 10.70.46.13:/bricks/c                 N/A       N/A        N       N/A
Self-heal Daemon on localhost               N/A       N/A        Y       2345

Task Status of Volume vol_7a1c
------------------------------------------------------------------------------
There are no active volume tasks
";

    #[test]
    fn test_parse_volume_status() {
        let bricks = parse_volume_status(STATUS);
        assert_eq!(bricks.len(), 3);

        assert_eq!(bricks[0].brick, "10.70.46.11:/var/lib/heketi/mounts/vg_1/brick_a/brick");
        assert_eq!(bricks[0].tcp_port, Some(49152));
        assert_eq!(bricks[0].pid, Some(1311));
        assert!(bricks[0].online);

        assert_eq!(bricks[2].brick, "10.70.46.13:/bricks/c");
        assert!(!bricks[2].online);
        assert_eq!(bricks[2].tcp_port, None);
        assert_eq!(bricks[2].pid, None);
    }

    #[test]
    fn test_no_bricks() {
        assert!(parse_volume_status("Volume vol_x is not started\n").is_empty());
    }
}
