//! End-to-end PVC workflows against a scripted runner

use assert_matches::assert_matches;
use cns_ocp_ops::ocp::manifest::StorageClassParams;
use cns_ocp_ops::{CommandOutput, Error, GlusterOps, MockRunner, OcClient, WaitSettings, WaitSettingsTable};
use std::collections::BTreeMap;

/// Budgets that retry without sleeping
fn fast_waits() -> WaitSettingsTable {
    let retry = WaitSettings::new(60, 0);
    WaitSettingsTable {
        resource_absence: retry,
        pod_ready: retry,
        dc_pod_name: retry,
        pvc_bound: retry,
        pvc_size: retry,
        pv_size: retry,
        events: retry,
    }
}

fn client() -> (OcClient<MockRunner>, MockRunner) {
    let mock = MockRunner::new();
    let oc = OcClient::new(mock.clone(), "master.example.com").with_waits(fast_waits());
    (oc, mock)
}

#[test]
fn test_pvc_lifecycle() {
    let (oc, mock) = client();
    mock.push_ok("storageclass.storage.k8s.io created\n")
        .push_ok("persistentvolumeclaim created\n")
        // wait for Bound
        .push_ok("Pending\n")
        .push_ok("Bound\n")
        // resize and verify
        .push_ok("persistentvolumeclaim patched\n")
        .push_ok("2Gi   1Gi\n")
        .push_ok("2Gi   2Gi\n")
        .push_ok("pvc-0b6f\n")
        .push_ok("2Gi\n")
        // delete and wait for absence
        .push_ok("kind: PersistentVolumeClaim\nmetadata:\n  name: claim\n")
        .push_ok("persistentvolumeclaim deleted\n")
        .push_failure(1, "Error from server (NotFound)")
        .push(CommandOutput::failed(1, ""));

    let mut parameters = BTreeMap::new();
    parameters.insert("resturl".to_string(), "http://heketi:8080".to_string());
    parameters.insert("bogus".to_string(), "dropped".to_string());
    let sc = oc
        .create_storage_class(&StorageClassParams {
            parameters,
            allow_volume_expansion: true,
            ..Default::default()
        })
        .unwrap();
    assert!(sc.starts_with("autotests-sc-"));

    let pvc = oc.create_pvc(&sc, "autotests-pvc", 1).unwrap();
    assert!(pvc.starts_with("autotests-pvc-"));

    oc.wait_for_pvc_bound(&pvc).unwrap();
    oc.resize_pvc(&pvc, 2).unwrap();
    oc.verify_pvc_size(&pvc, 2).unwrap();
    let pv = oc.pv_name_for_pvc(&pvc).unwrap();
    assert_eq!(pv, "pvc-0b6f");
    oc.verify_pv_size(&pv, 2).unwrap();

    oc.delete("pvc", &pvc, true).unwrap();
    oc.wait_for_resource_absence("pvc", &pvc).unwrap();

    assert_eq!(mock.remaining(), 0);

    let commands = mock.executed_commands();
    assert!(commands[0].ends_with("| oc create -f -"));
    assert!(commands[0].contains("\"resturl\":\"http://heketi:8080\""));
    assert!(!commands[0].contains("bogus"));
    assert_eq!(commands[2], format!("oc get pvc | grep {} | awk '{{print $2}}'", pvc));
    assert_eq!(commands[10], format!("oc delete pvc {}", pvc));
    assert_eq!(
        commands[12],
        format!("oc get pv -o=custom-columns=:.spec.claimRef.name | grep {}", pvc)
    );

    for (host, _) in mock.calls() {
        assert_eq!(host, "master.example.com");
    }
}

#[test]
fn test_pvc_never_binds() {
    let mock = MockRunner::new();
    let oc = OcClient::new(mock.clone(), "master");
    mock.push_ok("Pending\n");

    let err = oc
        .wait_for_pvc_bound_with("claim1", WaitSettings::new(0, 0))
        .unwrap_err();
    assert!(err.is_timeout());
    assert_matches!(err, Error::Timeout { ref operation, .. } if operation.contains("claim1"));

    // diagnostics are collected after the session expires
    let commands = mock.executed_commands();
    assert_eq!(commands.len(), 2);
    assert_eq!(commands[1], "oc describe pvc claim1 | grep ProvisioningFailed");
}

#[test]
fn test_probe_failure_aborts_wait() {
    let (oc, mock) = client();
    mock.push_failure(255, "ssh: connect to host master.example.com port 22: Connection refused");

    let err = oc.wait_for_pod_ready("autotests-dc-1-x").unwrap_err();
    assert!(err.is_transient());
    assert_matches!(err, Error::CommandFailed { exit_code: 255, .. });
    assert_eq!(mock.executed_commands().len(), 1);
}

#[test]
fn test_verify_gluster_volume_for_pvc() {
    let (oc, mock) = client();
    let pods = "glusterfs-storage-a   1/1   Running   0   3d   10.70.46.11   node1\n";
    mock.push_ok("Bound\n")
        .push_ok("pvc-0b6f\n")
        .push_ok("3c2b7e   vol_3c2b7e\n")
        .push_ok(pods)
        .push_ok(
            "Volume Name: vol_3c2b7e\nType: Replicate\nStatus: Started\n\
             Number of Bricks: 1 x 3 = 3\nBricks:\n\
             Brick1: 10.70.46.11:/bricks/a\n\
             Brick2: 10.70.46.12:/bricks/b\n\
             Brick3: 10.70.46.13:/bricks/c\n",
        )
        .push_ok(pods)
        .push_ok(
            "Brick 10.70.46.11:/bricks/a   49152   0   Y   101\n\
             Brick 10.70.46.12:/bricks/b   49152   0   Y   102\n\
             Brick 10.70.46.13:/bricks/c   49152   0   Y   103\n",
        );

    GlusterOps::new(&oc).verify_volume_for_pvc("claim1").unwrap();

    let commands = mock.executed_commands();
    assert_eq!(
        commands[4],
        "oc exec glusterfs-storage-a -- gluster volume info vol_3c2b7e"
    );
    assert_eq!(
        commands[6],
        "oc exec glusterfs-storage-a -- gluster volume status vol_3c2b7e"
    );
}
