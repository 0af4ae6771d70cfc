//! Resource Operations
//!
//! Create, query, patch and delete OpenShift resources with `oc`.

use super::manifest::{self, AppDcParams, SecretParams, StorageClassParams};
use super::parse::{self, PodSummary, VolumeNames};
use super::OcClient;
use crate::error::{Error, Result};
use crate::remote::{CommandOutput, CommandRunner};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, info};

/// Prefix shared by all gluster server pods
pub const GLUSTER_POD_PREFIX: &str = "glusterfs-";

/// Where `oc create` reads the resource definition from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateSource {
    /// Path of a file on the master node
    File(String),
    /// Document piped through stdin
    Stdin(String),
}

impl CreateSource {
    pub fn command(&self) -> String {
        match self {
            CreateSource::File(path) => format!("oc create -f {}", path),
            CreateSource::Stdin(data) => {
                format!("echo {} | oc create -f -", parse::shell_quote(data))
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            CreateSource::File(_) => "file",
            CreateSource::Stdin(_) => "stdin",
        }
    }
}

fn is_empty_document(value: &serde_yaml::Value) -> bool {
    match value {
        serde_yaml::Value::Null => true,
        serde_yaml::Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

impl<R: CommandRunner> OcClient<R> {
    // =========================================================================
    // Pods
    // =========================================================================

    /// Pods of the current project as printed by `oc get -o wide`
    pub fn get_pods(&self) -> Result<BTreeMap<String, PodSummary>> {
        let out = self.run_checked("oc get -o wide --no-headers=true pods")?;
        Ok(parse::parse_wide_pods(&out))
    }

    /// Full YAML of all pods in the current project
    pub fn get_pods_full(&self) -> Result<serde_yaml::Value> {
        let out = self.run_checked("oc get -o yaml pods")?;
        Ok(serde_yaml::from_str(&out)?)
    }

    /// Names of the gluster server pods, empty if there are none
    pub fn gluster_pod_names(&self) -> Result<Vec<String>> {
        Ok(self
            .get_pods()?
            .into_keys()
            .filter(|name| name.starts_with(GLUSTER_POD_PREFIX))
            .collect())
    }

    /// Names of the pods belonging to a DeploymentConfig, across namespaces
    pub fn dc_pod_names(&self, dc_name: &str) -> Result<Vec<String>> {
        let cmd = format!(
            "oc get pods --all-namespaces -o=custom-columns=:.metadata.name \
             --no-headers=true --selector deploymentconfig={}",
            dc_name
        );
        Ok(parse::nonempty_lines(&self.run_checked(&cmd)?))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Log in; `false` when `oc login` fails
    pub fn login(&self, username: &str, password: &str) -> Result<bool> {
        let cmd = format!("oc login --username={} --password={}", username, password);
        if !self.run(&cmd)?.success() {
            error!(host = %self.host(), "Failed to login to ocp master node");
            return Ok(false);
        }
        Ok(true)
    }

    /// Switch the current project; `false` when it fails
    pub fn switch_project(&self, project_name: &str) -> Result<bool> {
        if !self.run(&format!("oc project {}", project_name))?.success() {
            error!(project = project_name, "Failed to switch project");
            return Ok(false);
        }
        Ok(true)
    }

    /// Create a project; `true` on success or when it already exists
    pub fn create_namespace(&self, namespace: &str) -> Result<bool> {
        let output = self.run(&format!("oc new-project {}", namespace))?;
        if output.success() {
            info!(namespace, "New namespace created");
            return Ok(true);
        }
        let already_exists = [&output.stdout, &output.stderr]
            .iter()
            .any(|text| parse::first_line(text).contains("already exists"));
        if already_exists {
            info!(namespace, "Namespace already exists");
            return Ok(true);
        }
        error!(namespace, stderr = %output.stderr.trim(), "Failed to create namespace");
        Ok(false)
    }

    /// OpenShift server version from `oc version`
    pub fn version(&self) -> Result<String> {
        let cmd = "oc version | grep openshift | cut -d ' ' -f 2";
        let out = self.run_checked(cmd)?;
        let version = out.trim();
        if version.is_empty() {
            error!("Empty string found for oc version");
            return Err(Error::unexpected_output(cmd, out.as_str(), "empty version"));
        }
        Ok(version.to_string())
    }

    // =========================================================================
    // Pod Access
    // =========================================================================

    /// Copy a local directory of the master node into a pod
    pub fn rsync(&self, pod_name: &str, src_dir: &str, dest_dir: &str) -> Result<()> {
        let cmd = format!("oc rsync {} {}:{}", src_dir, pod_name, dest_dir);
        self.run_checked(&cmd)?;
        Ok(())
    }

    /// Run a command inside a pod with `oc rsh`; the raw output is returned
    pub fn rsh(&self, pod_name: &str, command: &str) -> Result<CommandOutput> {
        self.run(&format!("oc rsh {} {}", pod_name, command))
    }

    /// Run a command inside a pod with `oc exec`, failing on nonzero exit
    pub fn exec(&self, pod_name: &str, command: &str) -> Result<String> {
        self.run_checked(&format!("oc exec {} -- {}", pod_name, command))
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Create a resource from a file or from a piped document
    pub fn create(&self, source: &CreateSource) -> Result<()> {
        self.run_checked(&source.command())?;
        info!(source = source.kind(), "Created resource");
        Ok(())
    }

    fn create_json(&self, document: &Value) -> Result<()> {
        self.create(&CreateSource::Stdin(serde_json::to_string(document)?))
    }

    /// Render a template with `oc process` and return the result
    pub fn process(&self, params: &str, filename: &str) -> Result<String> {
        let out = self.run_checked(&format!("oc process -f {} {}", filename, params))?;
        info!(filename, "Processed template");
        Ok(out)
    }

    /// Create a Secret and return its name
    pub fn create_secret(&self, params: &SecretParams) -> Result<String> {
        let name = manifest::generate_name(&params.name_prefix);
        self.create_json(&manifest::secret(&name, params))?;
        Ok(name)
    }

    /// Create a StorageClass and return its name
    pub fn create_storage_class(&self, params: &StorageClassParams) -> Result<String> {
        let name = manifest::generate_name(&params.name_prefix);
        self.create_json(&manifest::storage_class(&name, params))?;
        Ok(name)
    }

    /// Create a ReadWriteOnce PVC of `size_gi` GiB and return its name
    pub fn create_pvc(&self, sc_name: &str, name_prefix: &str, size_gi: u64) -> Result<String> {
        let name = manifest::generate_name(name_prefix);
        self.create_json(&manifest::pvc(&name, sc_name, size_gi))?;
        Ok(name)
    }

    /// Create a DC whose pods keep writing to `pvc_name`; returns the DC name
    pub fn create_app_dc_with_io(&self, pvc_name: &str, params: &AppDcParams) -> Result<String> {
        let name = manifest::generate_name(&params.name_prefix);
        self.create_json(&manifest::app_dc_with_io(&name, pvc_name, params))?;
        Ok(name)
    }

    /// Create an idle pod with `pvc_name` mounted at `mount_path`
    pub fn create_tiny_pod_with_volume(
        &self,
        pvc_name: &str,
        name_prefix: &str,
        mount_path: &str,
    ) -> Result<String> {
        let name = manifest::generate_name(name_prefix);
        self.create_json(&manifest::tiny_pod_with_volume(&name, pvc_name, mount_path))?;
        Ok(name)
    }

    // =========================================================================
    // Get / Delete
    // =========================================================================

    /// Get a resource (or all resources of a type) as YAML.
    ///
    /// When the get fails and `raise_on_error` is false an empty mapping is
    /// returned.
    pub fn get_yaml(
        &self,
        rtype: &str,
        name: Option<&str>,
        raise_on_error: bool,
    ) -> Result<serde_yaml::Value> {
        let mut cmd = format!("oc get -oyaml {}", rtype);
        if let Some(name) = name {
            cmd.push(' ');
            cmd.push_str(name);
        }
        let output = self.run(&cmd)?;
        if !output.success() {
            error!(rtype, name, stderr = %output.stderr.trim(), "Failed to get resource");
            if raise_on_error {
                return Err(output.into_error(&cmd));
            }
            return Ok(serde_yaml::Value::Mapping(Default::default()));
        }
        Ok(serde_yaml::from_str(&output.stdout)?)
    }

    pub fn get_pvc(&self, name: &str) -> Result<serde_yaml::Value> {
        self.get_yaml("pvc", Some(name), true)
    }

    pub fn get_pv(&self, name: &str) -> Result<serde_yaml::Value> {
        self.get_yaml("pv", Some(name), true)
    }

    pub fn get_all_pvs(&self) -> Result<serde_yaml::Value> {
        self.get_yaml("pv", None, true)
    }

    /// Delete a resource by name.
    ///
    /// A missing resource is an error only when `raise_on_absence` is set.
    pub fn delete(&self, rtype: &str, name: &str, raise_on_absence: bool) -> Result<()> {
        let current = self.get_yaml(rtype, Some(name), raise_on_absence)?;
        if is_empty_document(&current) {
            return Ok(());
        }
        self.run_checked(&format!("oc delete {} {}", rtype, name))?;
        info!(rtype, name, "Deleted resource");
        Ok(())
    }

    // =========================================================================
    // PVC / PV
    // =========================================================================

    /// STATUS column of a PVC; empty when the PVC is not listed
    pub fn pvc_status(&self, pvc_name: &str) -> Result<String> {
        let cmd = format!("oc get pvc | grep {} | awk '{{print $2}}'", pvc_name);
        let out = self.run_checked(&cmd)?;
        Ok(parse::first_line(&out))
    }

    /// Request a new storage size for a PVC
    pub fn resize_pvc(&self, pvc_name: &str, size_gi: u64) -> Result<()> {
        let cmd = format!(
            "oc patch pvc {} -p='{{\"spec\": {{\"resources\": {{\"requests\": \
             {{\"storage\": \"{}Gi\"}}}}}}}}'",
            pvc_name, size_gi
        );
        let out = self.run_checked(&cmd)?;
        info!(pvc = pvc_name, size_gi, out = %out.trim(), "Edited storage capacity of pvc");
        Ok(())
    }

    /// Name of the PV bound to a PVC
    pub fn pv_name_for_pvc(&self, pvc_name: &str) -> Result<String> {
        let cmd = format!("oc get pvc {} -o=custom-columns=:.spec.volumeName", pvc_name);
        let pv_name = self.run_checked(&cmd)?.trim().to_string();
        info!(pvc = pvc_name, pv = %pv_name, "Resolved pv name");
        Ok(pv_name)
    }

    /// Heketi and Gluster volume names backing a PV
    pub fn volume_names_for_pv(&self, pv_name: &str) -> Result<VolumeNames> {
        let cmd = format!(
            "oc get pv {} -o=custom-columns=\
             :.metadata.annotations.'gluster\\.kubernetes\\.io\\/heketi\\-volume\\-id',\
             :.spec.glusterfs.path",
            pv_name
        );
        let out = self.run_checked(&cmd)?;
        let names = parse::parse_volume_names(&out)
            .ok_or_else(|| Error::unexpected_output(&cmd, out.as_str(), "expected two columns"))?;
        info!(
            pv = pv_name,
            heketi_vol = %names.heketi_vol,
            gluster_vol = %names.gluster_vol,
            "Resolved volume names"
        );
        Ok(names)
    }

    /// Scale a DeploymentConfig without waiting
    pub fn scale_dc(&self, dc_name: &str, replicas: u32, namespace: Option<&str>) -> Result<()> {
        let mut cmd = format!("oc scale --replicas={} dc/{}", replicas, dc_name);
        if let Some(ns) = namespace {
            cmd.push_str(&format!(" --namespace={}", ns));
        }
        self.run_checked(&cmd)?;
        info!(dc = dc_name, replicas, "Scaled deployment config");
        Ok(())
    }
}
