//! gluster-block and heketi records
//!
//! Typed views over `gluster-block info <vol>/<block> --json` and the two
//! `heketi-cli ... --json` lookups needed to find a block hosting volume.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output of `gluster-block info --json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockVolumeInfo {
    #[serde(rename = "NAME")]
    pub name: String,
    /// Block hosting volume
    #[serde(rename = "VOLUME")]
    pub volume: String,
    #[serde(rename = "GBID", default)]
    pub gbid: String,
    /// Human-readable size, e.g. `1.0 GiB`
    #[serde(rename = "SIZE", default)]
    pub size: String,
    /// High-availability count
    #[serde(rename = "HA", default)]
    pub ha: u32,
    #[serde(rename = "PASSWORD", default)]
    pub password: Option<String>,
    /// Nodes the block device is exported on
    #[serde(rename = "EXPORTED ON", alias = "EXPORTED NODE(S)", default)]
    pub exported_on: Vec<String>,
    /// Fields not modelled above
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

pub fn parse_block_volume_info(json: &str) -> Result<BlockVolumeInfo> {
    Ok(serde_json::from_str(json)?)
}

#[derive(Debug, Deserialize)]
struct HeketiBlockVolume {
    blockhostingvolume: String,
}

#[derive(Debug, Deserialize)]
struct HeketiVolume {
    name: String,
}

/// `blockhostingvolume` of `heketi-cli blockvolume info --json`
pub fn parse_heketi_block_hosting_volume(json: &str) -> Result<String> {
    let info: HeketiBlockVolume = serde_json::from_str(json)?;
    Ok(info.blockhostingvolume)
}

/// `name` of `heketi-cli volume info --json`
pub fn parse_heketi_volume_name(json: &str) -> Result<String> {
    let info: HeketiVolume = serde_json::from_str(json)?;
    Ok(info.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_block_volume_info() {
        let info = parse_block_volume_info(
            r#"{"NAME":"blk_claim1_0f9e","VOLUME":"vol_3c2b","GBID":"6a0e",
                "SIZE":"1.0 GiB","HA":3,"PASSWORD":"",
                "EXPORTED ON":["10.70.46.11","10.70.46.12","10.70.46.13"],
                "RING BUFFER": 0}"#,
        )
        .unwrap();
        assert_eq!(info.name, "blk_claim1_0f9e");
        assert_eq!(info.volume, "vol_3c2b");
        assert_eq!(info.ha, 3);
        assert_eq!(info.exported_on.len(), 3);
        assert!(info.extra.contains_key("RING BUFFER"));
    }

    #[test]
    fn test_parse_heketi_lookups() {
        assert_eq!(
            parse_heketi_block_hosting_volume(r#"{"id":"b1","blockhostingvolume":"v1"}"#).unwrap(),
            "v1"
        );
        assert_eq!(
            parse_heketi_volume_name(r#"{"id":"v1","name":"vol_v1","size":100}"#).unwrap(),
            "vol_v1"
        );
        assert_matches!(parse_heketi_volume_name("{}"), Err(Error::Json(_)));
    }
}
