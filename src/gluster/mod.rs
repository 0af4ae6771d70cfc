//! Gluster Operations
//!
//! Queries the Gluster backend through the gluster pods of an OpenShift
//! cluster:
//! - volume: `gluster volume info` parsing
//! - status: `gluster volume status` parsing
//! - block: `gluster-block` and heketi JSON records
//!
//! [`GlusterOps`] ties the parsers to an [`OcClient`] to resolve PVCs to
//! Gluster volumes and verify their bricks.

pub mod block;
pub mod status;
pub mod volume;

pub use block::BlockVolumeInfo;
pub use status::BrickStatus;
pub use volume::{Brick, VolumeInfo};

use crate::error::{Error, Result};
use crate::ocp::parse::{self, GlusterPodLocation};
use crate::ocp::OcClient;
use crate::remote::CommandRunner;
use tracing::{error, info};

/// Provisioner annotation value for file volumes
pub const GLUSTERFS_PROVISIONER: &str = "kubernetes.io/glusterfs";
/// Provisioner annotation value for block volumes
pub const GLUSTERBLOCK_PROVISIONER: &str = "gluster.org/glusterblock";

/// Gluster queries executed through gluster pods
pub struct GlusterOps<'a, R: CommandRunner> {
    oc: &'a OcClient<R>,
}

impl<'a, R: CommandRunner> GlusterOps<'a, R> {
    pub fn new(oc: &'a OcClient<R>) -> Self {
        Self { oc }
    }

    /// A gluster pod to run gluster commands in
    fn gluster_pod(&self) -> Result<String> {
        self.oc
            .gluster_pod_names()?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Verification("no gluster pods found".into()))
    }

    // =========================================================================
    // Volume Queries
    // =========================================================================

    /// `gluster volume info` for one volume
    pub fn volume_info(&self, volume: &str) -> Result<VolumeInfo> {
        let pod = self.gluster_pod()?;
        let out = self.oc.exec(&pod, &format!("gluster volume info {}", volume))?;
        volume::parse_volume_info(&out)?
            .into_iter()
            .find(|v| v.name == volume)
            .ok_or_else(|| {
                Error::unexpected_output("gluster volume info", out.as_str(), "volume not listed")
            })
    }

    /// Brick rows of `gluster volume status`
    pub fn volume_status(&self, volume: &str) -> Result<Vec<BrickStatus>> {
        let pod = self.gluster_pod()?;
        let out = self.oc.exec(&pod, &format!("gluster volume status {}", volume))?;
        Ok(status::parse_volume_status(&out))
    }

    /// Gluster volume backing a file PVC
    pub fn volume_info_for_pvc(&self, pvc_name: &str) -> Result<VolumeInfo> {
        let pv_name = self.oc.pv_name_for_pvc(pvc_name)?;
        if pv_name.is_empty() {
            return Err(Error::ResourceState {
                kind: "PVC".into(),
                name: pvc_name.into(),
                state: "no bound PV".into(),
            });
        }

        let cmd = format!("oc get pv {} -o=custom-columns=:.spec.glusterfs.path", pv_name);
        let volume = self.oc.run_checked(&cmd)?.trim().to_string();
        if volume.is_empty() {
            return Err(Error::unexpected_output(&cmd, "", "empty gluster volume path"));
        }

        self.volume_info(&volume)
    }

    // =========================================================================
    // Block Volumes
    // =========================================================================

    /// Block hosting volume id of a heketi block volume
    pub fn heketi_block_hosting_volume_id(&self, heketi_url: &str, block_id: &str) -> Result<String> {
        let out = self.oc.run_checked(&format!(
            "heketi-cli -s {} blockvolume info {} --json",
            heketi_url, block_id
        ))?;
        block::parse_heketi_block_hosting_volume(&out)
    }

    /// Name of a heketi volume
    pub fn heketi_volume_name(&self, heketi_url: &str, volume_id: &str) -> Result<String> {
        let out = self.oc.run_checked(&format!(
            "heketi-cli -s {} volume info {} --json",
            heketi_url, volume_id
        ))?;
        block::parse_heketi_volume_name(&out)
    }

    /// `gluster-block info` of the block volume backing a PVC
    pub fn block_volume_info_for_pvc(
        &self,
        heketi_url: &str,
        pvc_name: &str,
    ) -> Result<BlockVolumeInfo> {
        let cmd = format!(
            "oc get pv --no-headers -o custom-columns=\
             :.metadata.annotations.glusterBlockShare,\
             :.metadata.annotations.\"gluster\\.org\\/volume\\-id\",\
             :.spec.claimRef.name | grep \"{}\"",
            pvc_name
        );
        let out = self.oc.run_checked(&cmd)?;
        let (block_name, block_id) = parse::parse_block_volume_row(&out)
            .ok_or_else(|| Error::unexpected_output(&cmd, out.as_str(), "expected 3 fields"))?;

        let hosting_id = self.heketi_block_hosting_volume_id(heketi_url, &block_id)?;
        let hosting_name = self.heketi_volume_name(heketi_url, &hosting_id)?;

        let pod = self.gluster_pod()?;
        let json = self.oc.exec(
            &pod,
            &format!("gluster-block info {}/{} --json", hosting_name, block_name),
        )?;
        block::parse_block_volume_info(&json)
    }

    // =========================================================================
    // Pod Placement
    // =========================================================================

    /// Gluster pods on the nodes that hold bricks of a PVC
    pub fn pod_locations_for_pvc(&self, pvc_name: &str) -> Result<Vec<GlusterPodLocation>> {
        let sp_cmd = format!(
            "oc get pvc {} --no-headers -o=custom-columns=\
             :.metadata.annotations.\"volume\\.beta\\.kubernetes\\.io\\/storage\\-provisioner\"",
            pvc_name
        );
        let provisioner = self.oc.run_checked(&sp_cmd)?.trim().to_string();

        let node_ips = match provisioner.as_str() {
            GLUSTERFS_PROVISIONER => self.volume_info_for_pvc(pvc_name)?.brick_hosts(),
            GLUSTERBLOCK_PROVISIONER => {
                let cmd = format!(
                    "oc get pv --template '{{{{range .items}}}}\
                     {{{{if eq .spec.claimRef.name \"{}\"}}}}\
                     {{{{.spec.iscsi.targetPortal}}}}{{{{\" \"}}}}\
                     {{{{.spec.iscsi.portals}}}}{{{{end}}}}{{{{end}}}}'",
                    pvc_name
                );
                parse::parse_iscsi_portals(&self.oc.run_checked(&cmd)?)
                    .into_iter()
                    .map(|portal| {
                        portal
                            .rsplit_once(':')
                            .map(|(ip, _port)| ip.to_string())
                            .unwrap_or_else(|| portal.clone())
                    })
                    .collect()
            }
            other => {
                return Err(Error::unexpected_output(
                    &sp_cmd,
                    other,
                    "unexpected storage provisioner",
                ))
            }
        };

        let node_cmd = format!(
            "oc get node -o wide | grep -e '{} ' | awk '{{print $1}}'",
            node_ips.join(" ' -e '")
        );
        let node_names = parse::nonempty_lines(&self.oc.run_checked(&node_cmd)?);
        if node_names.len() < 2 {
            return Err(Error::Verification(format!(
                "expected more than one node hosting Gluster pods, got {}",
                node_names.len()
            )));
        }

        let pod_cmd = format!(
            "oc get pods --all-namespaces \
             -o=custom-columns=:.metadata.name,:.spec.nodeName,:.status.hostIP | \
             grep 'glusterfs-' | grep -e '{} '",
            node_names.join(" ' -e '")
        );
        let out = self.oc.run_checked(&pod_cmd)?;
        let pods = parse::parse_gluster_pod_rows(&out).ok_or_else(|| {
            Error::unexpected_output(&pod_cmd, out.as_str(), "expected name, node and host IP")
        })?;
        if pods.len() < 3 {
            return Err(Error::Verification(format!(
                "expected 3 or more Gluster pods, found {}",
                pods.len()
            )));
        }
        Ok(pods)
    }

    // =========================================================================
    // Brick Verification
    // =========================================================================

    /// Check that exactly `expected` bricks of a volume are online
    pub fn verify_brick_count(&self, volume: &str, expected: usize) -> Result<()> {
        let online = self
            .volume_status(volume)?
            .into_iter()
            .filter(|b| b.online)
            .count();
        if online != expected {
            return Err(Error::Verification(format!(
                "brick count for volume {}: expected {}, found {}",
                volume, expected, online
            )));
        }
        info!(volume, count = expected, "Verified brick count");
        Ok(())
    }

    /// Check that every brick listed by `volume info` is online
    pub fn verify_bricks_online(&self, volume: &str) -> Result<()> {
        let info = self.volume_info(volume)?;
        if info.bricks.is_empty() {
            error!(volume, "Failed to get brick list");
            return Err(Error::Verification(format!(
                "no bricks listed for volume {}",
                volume
            )));
        }

        let status = self.volume_status(volume)?;
        let offline: Vec<&str> = info
            .bricks
            .iter()
            .filter(|brick| !status.iter().any(|s| s.brick == brick.name && s.online))
            .map(|brick| brick.name.as_str())
            .collect();

        if !offline.is_empty() {
            error!(volume, offline = ?offline, "Bricks are offline");
            return Err(Error::Verification(format!(
                "bricks of volume {} are offline: {}",
                volume,
                offline.join(", ")
            )));
        }
        info!(volume, "All bricks online");
        Ok(())
    }

    /// Wait for a PVC to bind, then check that its Gluster volume has all
    /// bricks online
    pub fn verify_volume_for_pvc(&self, pvc_name: &str) -> Result<()> {
        self.oc.wait_for_pvc_bound(pvc_name)?;
        let pv_name = self.oc.pv_name_for_pvc(pvc_name)?;
        let names = self.oc.volume_names_for_pv(&pv_name)?;
        self.verify_bricks_online(&names.gluster_vol)?;
        info!(pvc = pvc_name, volume = %names.gluster_vol, "Verified gluster volume for pvc");
        Ok(())
    }
}
