//! Resource Manifests
//!
//! Builders for the JSON documents piped into `oc create -f -`. Each
//! builder is pure; the client generates the name and submits the result.

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// StorageClass parameters accepted by the glusterfs provisioners
pub const ALLOWED_SC_PARAMETERS: &[&str] = &[
    "resturl",
    "secretnamespace",
    "restuser",
    "secretname",
    "restauthenabled",
    "restsecretnamespace",
    "restsecretname",
    "hacount",
    "clusterids",
    "chapauthenabled",
    "volumenameprefix",
    "volumeoptions",
    "volumetype",
];

const APP_IMAGE: &str = "cirros";

// =============================================================================
// Naming
// =============================================================================

/// Random lowercase suffix usable in DNS-1123 names
pub fn random_suffix(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

/// `<prefix>-<random>`
pub fn generate_name(prefix: &str) -> String {
    format!("{}-{}", prefix, random_suffix(8))
}

// =============================================================================
// Secret
// =============================================================================

/// Parameters for a generated Secret
#[derive(Debug, Clone)]
pub struct SecretParams {
    pub name_prefix: String,
    pub namespace: String,
    /// Plain-text value stored under the `key` entry
    pub data: String,
    pub secret_type: String,
}

impl Default for SecretParams {
    fn default() -> Self {
        Self {
            name_prefix: "autotests-secret".to_string(),
            namespace: "default".to_string(),
            data: "password".to_string(),
            secret_type: "kubernetes.io/glusterfs".to_string(),
        }
    }
}

/// Secret manifest; `stringData` lets the API server do the base64 encoding
pub fn secret(name: &str, params: &SecretParams) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": params.namespace,
        },
        "stringData": {"key": params.data},
        "type": params.secret_type,
    })
}

// =============================================================================
// StorageClass
// =============================================================================

/// Parameters for a generated StorageClass
#[derive(Debug, Clone)]
pub struct StorageClassParams {
    pub name_prefix: String,
    pub provisioner: String,
    pub allow_volume_expansion: bool,
    /// Provisioner parameters; unknown keys are dropped
    pub parameters: BTreeMap<String, String>,
}

impl Default for StorageClassParams {
    fn default() -> Self {
        Self {
            name_prefix: "autotests-sc".to_string(),
            provisioner: "kubernetes.io/glusterfs".to_string(),
            allow_volume_expansion: false,
            parameters: BTreeMap::new(),
        }
    }
}

/// Keep only the parameters the provisioner understands (case-insensitive)
pub fn filter_sc_parameters(parameters: &BTreeMap<String, String>) -> Map<String, Value> {
    parameters
        .iter()
        .filter(|(key, _)| ALLOWED_SC_PARAMETERS.contains(&key.to_lowercase().as_str()))
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

pub fn storage_class(name: &str, params: &StorageClassParams) -> Value {
    json!({
        "kind": "StorageClass",
        "apiVersion": "storage.k8s.io/v1",
        "metadata": {"name": name},
        "provisioner": params.provisioner,
        "parameters": filter_sc_parameters(&params.parameters),
        "allowVolumeExpansion": params.allow_volume_expansion,
    })
}

// =============================================================================
// PersistentVolumeClaim
// =============================================================================

pub fn pvc(name: &str, storage_class: &str, size_gi: u64) -> Value {
    json!({
        "kind": "PersistentVolumeClaim",
        "apiVersion": "v1",
        "metadata": {
            "name": name,
            "annotations": {
                "volume.beta.kubernetes.io/storage-class": storage_class,
            },
        },
        "spec": {
            "accessModes": ["ReadWriteOnce"],
            "resources": {"requests": {"storage": format!("{}Gi", size_gi)}},
        },
    })
}

// =============================================================================
// DeploymentConfig with constant I/O
// =============================================================================

/// Parameters for an application DC writing to its claim in a loop
#[derive(Debug, Clone)]
pub struct AppDcParams {
    pub name_prefix: String,
    pub replicas: u32,
    /// Bytes rewritten on every loop iteration
    pub space_to_use: u64,
}

impl Default for AppDcParams {
    fn default() -> Self {
        Self {
            name_prefix: "autotests-dc-with-app-io".to_string(),
            replicas: 1,
            space_to_use: 1_048_576,
        }
    }
}

pub fn app_dc_with_io(name: &str, pvc_name: &str, params: &AppDcParams) -> Value {
    let io_loop = format!(
        "trap \"rm -f /mnt/random-data-$HOSTNAME.log ; exit 0\" SIGTERM; \
         while true; do \
          (mount | grep '/mnt') && \
           (head -c {} < /dev/urandom > /mnt/random-data-$HOSTNAME.log) || \
            exit 1; \
          sleep 1 ; \
         done",
        params.space_to_use
    );
    let container = json!({
        "name": name,
        "image": APP_IMAGE,
        "volumeMounts": [{"mountPath": "/mnt", "name": name}],
        "command": ["sh"],
        "args": ["-ec", io_loop],
        "livenessProbe": {
            "initialDelaySeconds": 3,
            "periodSeconds": 3,
            "exec": {"command": [
                "sh", "-ec",
                "mount | grep '/mnt' && \
                 head -c 1 < /dev/urandom >> /mnt/random-data-$HOSTNAME.log",
            ]},
        },
    });
    json!({
        "kind": "DeploymentConfig",
        "apiVersion": "v1",
        "metadata": {"name": name},
        "spec": {
            "replicas": params.replicas,
            "triggers": [{"type": "ConfigChange"}],
            "paused": false,
            "revisionHistoryLimit": 2,
            "template": {
                "metadata": {"labels": {"name": name}},
                "spec": {
                    "restartPolicy": "Always",
                    "volumes": [{
                        "name": name,
                        "persistentVolumeClaim": {"claimName": pvc_name},
                    }],
                    "containers": [container],
                    "terminationGracePeriodSeconds": 20,
                },
            },
        },
    })
}

// =============================================================================
// Tiny Pod
// =============================================================================

/// Minimal pod that mounts a claim and idles
pub fn tiny_pod_with_volume(name: &str, pvc_name: &str, mount_path: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {"name": name},
        "spec": {
            "terminationGracePeriodSeconds": 20,
            "containers": [{
                "name": name,
                "image": APP_IMAGE,
                "volumeMounts": [{"mountPath": mount_path, "name": "vol"}],
                "command": [
                    "/bin/sh", "-ec",
                    "trap 'exit 0' SIGTERM ; while :; do echo '.'; sleep 5 ; done",
                ],
            }],
            "volumes": [{
                "name": "vol",
                "persistentVolumeClaim": {"claimName": pvc_name},
            }],
            "restartPolicy": "Never",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_name() {
        let name = generate_name("autotests-pvc");
        let suffix = name.strip_prefix("autotests-pvc-").unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_secret_manifest() {
        let doc = secret("s1", &SecretParams::default());
        assert_eq!(doc["kind"], "Secret");
        assert_eq!(doc["metadata"]["namespace"], "default");
        assert_eq!(doc["stringData"]["key"], "password");
        assert_eq!(doc["type"], "kubernetes.io/glusterfs");
    }

    #[test]
    fn test_storage_class_filters_parameters() {
        let mut params = StorageClassParams::default();
        params.allow_volume_expansion = true;
        params
            .parameters
            .insert("resturl".into(), "http://heketi:8080".into());
        params.parameters.insert("HAcount".into(), "3".into());
        params.parameters.insert("bogus".into(), "x".into());

        let doc = storage_class("sc1", &params);
        let parameters = doc["parameters"].as_object().unwrap();
        assert_eq!(parameters.len(), 2);
        assert_eq!(parameters["resturl"], "http://heketi:8080");
        assert_eq!(parameters["HAcount"], "3");
        assert_eq!(doc["allowVolumeExpansion"], true);
    }

    #[test]
    fn test_pvc_manifest() {
        let doc = pvc("claim1", "sc1", 5);
        assert_eq!(doc["spec"]["resources"]["requests"]["storage"], "5Gi");
        assert_eq!(
            doc["metadata"]["annotations"]["volume.beta.kubernetes.io/storage-class"],
            "sc1"
        );
    }

    #[test]
    fn test_app_dc_manifest() {
        let params = AppDcParams {
            replicas: 2,
            space_to_use: 4096,
            ..Default::default()
        };
        let doc = app_dc_with_io("dc1", "claim1", &params);
        assert_eq!(doc["spec"]["replicas"], 2);
        let template = &doc["spec"]["template"]["spec"];
        assert_eq!(
            template["volumes"][0]["persistentVolumeClaim"]["claimName"],
            "claim1"
        );
        let args = template["containers"][0]["args"][1].as_str().unwrap();
        assert!(args.contains("head -c 4096"));
    }

    #[test]
    fn test_tiny_pod_manifest() {
        let doc = tiny_pod_with_volume("pod1", "claim1", "/data");
        assert_eq!(
            doc["spec"]["containers"][0]["volumeMounts"][0]["mountPath"],
            "/data"
        );
        assert_eq!(doc["spec"]["restartPolicy"], "Never");
    }
}
