//! Polling Operations
//!
//! Every call site here owns one [`Waiter`](crate::waiter::Waiter) for the
//! duration of a single wait and turns an expired session into
//! [`Error::Timeout`]. Probe failures are handled per call site: most fail
//! fast, resource absence treats a failed `get` as the awaited condition.

use super::events::{Event, EventFilter};
use super::parse;
use super::OcClient;
use crate::config::WaitSettings;
use crate::error::{Error, Result};
use crate::remote::CommandRunner;
use tracing::{debug, error, info};

impl<R: CommandRunner> OcClient<R> {
    // =========================================================================
    // Resource Absence
    // =========================================================================

    /// Wait until a resource can no longer be fetched
    pub fn wait_for_resource_absence(&self, rtype: &str, name: &str) -> Result<()> {
        self.wait_for_resource_absence_with(rtype, name, self.waits().resource_absence)
    }

    /// Wait until a resource can no longer be fetched.
    ///
    /// For `pvc` the same session then waits until no PV claim references
    /// the name any more.
    pub fn wait_for_resource_absence_with(
        &self,
        rtype: &str,
        name: &str,
        settings: WaitSettings,
    ) -> Result<()> {
        let mut waiter = settings.waiter();
        for tick in waiter.by_ref() {
            match self.get_yaml(rtype, Some(name), true) {
                Ok(_) => debug!(rtype, name, attempt = tick.attempt, "Resource still present"),
                Err(Error::CommandFailed { .. }) => break,
                Err(e) => return Err(e),
            }
        }

        if rtype == "pvc" {
            let cmd = format!(
                "oc get pv -o=custom-columns=:.spec.claimRef.name | grep {}",
                name
            );
            for tick in waiter.by_ref() {
                if !self.run(&cmd)?.success() {
                    break;
                }
                debug!(pvc = name, attempt = tick.attempt, "PV still claimed");
            }
        }

        if waiter.is_expired() {
            error!(
                rtype,
                name,
                timeout_secs = settings.timeout_secs,
                "Resource still exists after waiting"
            );
            return Err(Error::timeout(
                format!("removal of {} '{}'", rtype, name),
                settings.timeout(),
            ));
        }
        Ok(())
    }

    // =========================================================================
    // Pod Readiness
    // =========================================================================

    /// Wait until the first container of a pod is ready and the pod is `Running`
    pub fn wait_for_pod_ready(&self, pod_name: &str) -> Result<()> {
        self.wait_for_pod_ready_with(pod_name, self.waits().pod_ready)
    }

    pub fn wait_for_pod_ready_with(&self, pod_name: &str, settings: WaitSettings) -> Result<()> {
        let cmd = format!(
            "oc get pods {} -o=custom-columns=\
             :.status.containerStatuses[0].ready,:.status.phase",
            pod_name
        );

        let mut waiter = settings.waiter();
        let ready = waiter.until(|_| {
            let out = self.run_checked(&cmd)?;
            let readiness = parse::parse_pod_readiness(&out).ok_or_else(|| {
                Error::unexpected_output(&cmd, out.as_str(), "expected ready and phase columns")
            })?;

            if readiness.is_running_and_ready() {
                info!(pod = pod_name, "Pod is ready and running");
                return Ok(Some(()));
            }
            if readiness.phase == "Error" {
                error!(pod = pod_name, "Pod status error");
                return Err(Error::ResourceState {
                    kind: "pod".into(),
                    name: pod_name.into(),
                    state: readiness.phase,
                });
            }
            info!(
                pod = pod_name,
                ready = readiness.ready,
                phase = %readiness.phase,
                interval_secs = settings.interval_secs,
                "Pod not ready yet"
            );
            Ok(None)
        })?;

        ready.ok_or_else(|| {
            error!(pod = pod_name, timeout_secs = settings.timeout_secs, "Exceeded timeout waiting for pod");
            Error::timeout(format!("readiness of pod '{}'", pod_name), settings.timeout())
        })
    }

    /// Wait for a DeploymentConfig to have a pod and return its name
    pub fn pod_name_from_dc(&self, dc_name: &str) -> Result<String> {
        self.pod_name_from_dc_with(dc_name, self.waits().dc_pod_name)
    }

    pub fn pod_name_from_dc_with(&self, dc_name: &str, settings: WaitSettings) -> Result<String> {
        let cmd = format!(
            "oc get pods --all-namespaces -o=custom-columns=:.metadata.name \
             --no-headers=true --selector deploymentconfig={}",
            dc_name
        );

        let mut waiter = settings.waiter();
        let pod_name = waiter.until(|_| {
            let out = self.run_checked(&cmd)?;
            let output = out.trim();
            if output.is_empty() {
                info!(dc = dc_name, interval_secs = settings.interval_secs, "Pod name for dc not found");
                return Ok(None);
            }
            info!(dc = dc_name, pod = output, "Found pod name for dc");
            Ok(Some(output.to_string()))
        })?;

        pod_name.ok_or_else(|| {
            error!(dc = dc_name, timeout_secs = settings.timeout_secs, "Exceeded timeout waiting for pod name");
            Error::timeout(format!("pod lookup for dc '{}'", dc_name), settings.timeout())
        })
    }

    /// Scale a DeploymentConfig, then wait for its pods to be ready
    /// (`replicas > 0`) or gone (`replicas == 0`)
    pub fn scale_dc_and_wait(
        &self,
        dc_name: &str,
        replicas: u32,
        namespace: Option<&str>,
    ) -> Result<()> {
        self.scale_dc(dc_name, replicas, namespace)?;
        for pod in self.dc_pod_names(dc_name)? {
            if replicas == 0 {
                self.wait_for_resource_absence("pod", &pod)?;
            } else {
                self.wait_for_pod_ready(&pod)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // PVC Binding
    // =========================================================================

    /// Wait until a PVC reports `Bound`
    pub fn wait_for_pvc_bound(&self, pvc_name: &str) -> Result<()> {
        self.wait_for_pvc_bound_with(pvc_name, self.waits().pvc_bound)
    }

    /// Wait until a PVC reports `Bound`.
    ///
    /// `Pending` is retried and a missing PVC is tolerated once; any other
    /// status ends the wait with an error.
    pub fn wait_for_pvc_bound_with(&self, pvc_name: &str, settings: WaitSettings) -> Result<()> {
        let mut not_found_seen = false;
        let mut waiter = settings.waiter();

        for _ in waiter.by_ref() {
            let status = self.pvc_status(pvc_name)?;
            match status.as_str() {
                "Bound" => break,
                "Pending" => {
                    info!(pvc = pvc_name, interval_secs = settings.interval_secs, "PVC is pending");
                }
                "" if !not_found_seen => {
                    not_found_seen = true;
                    info!(pvc = pvc_name, interval_secs = settings.interval_secs, "PVC not found");
                }
                "" => {
                    error!(pvc = pvc_name, "PVC has not been found 2 times already");
                    return Err(Error::ResourceState {
                        kind: "PVC".into(),
                        name: pvc_name.into(),
                        state: "not found twice, check the PVC name".into(),
                    });
                }
                other => {
                    error!(pvc = pvc_name, status = other, "PVC has unexpected status");
                    return Err(Error::ResourceState {
                        kind: "PVC".into(),
                        name: pvc_name.into(),
                        state: other.to_string(),
                    });
                }
            }
        }

        if waiter.is_expired() {
            let cmd = format!("oc describe pvc {} | grep ProvisioningFailed", pvc_name);
            let describe = self.run(&cmd)?;
            info!(
                command = %cmd,
                out = %describe.stdout.trim(),
                err = %describe.stderr.trim(),
                "Provisioning diagnostics"
            );
            error!(pvc = pvc_name, timeout_secs = settings.timeout_secs, "PVC did not reach Bound status");
            return Err(Error::timeout(
                format!("binding of PVC '{}'", pvc_name),
                settings.timeout(),
            ));
        }

        info!(pvc = pvc_name, "PVC is in Bound state");
        Ok(())
    }

    // =========================================================================
    // Size Convergence
    // =========================================================================

    /// Wait until both the requested and provisioned size of a PVC equal `size_gi`
    pub fn verify_pvc_size(&self, pvc_name: &str, size_gi: u64) -> Result<()> {
        self.verify_pvc_size_with(pvc_name, size_gi, self.waits().pvc_size)
    }

    pub fn verify_pvc_size_with(
        &self,
        pvc_name: &str,
        size_gi: u64,
        settings: WaitSettings,
    ) -> Result<()> {
        let cmd = format!(
            "oc get pvc {} -o=custom-columns=\
             :.spec.resources.requests.storage,:.status.capacity.storage",
            pvc_name
        );

        let mut last = None;
        let mut waiter = settings.waiter();
        let matched = waiter.until(|_| {
            let out = self.run_checked(&cmd)?;
            let sizes = parse::parse_pvc_sizes(&out).ok_or_else(|| {
                Error::unexpected_output(&cmd, out.as_str(), "expected two Gi quantities")
            })?;
            if sizes.spec_gi == size_gi && sizes.actual_gi == size_gi {
                info!(pvc = pvc_name, size_gi, "PVC size verified");
                return Ok(Some(()));
            }
            debug!(
                pvc = pvc_name,
                spec_gi = sizes.spec_gi,
                actual_gi = sizes.actual_gi,
                "PVC size not converged"
            );
            last = Some(sizes);
            Ok(None)
        })?;

        matched.ok_or_else(|| {
            error!(pvc = pvc_name, size_gi, last = ?last, "Verification of pvc size failed");
            Error::timeout(
                format!("resize of PVC '{}' to {}Gi", pvc_name, size_gi),
                settings.timeout(),
            )
        })
    }

    /// Wait until the capacity of a PV equals `size_gi`
    pub fn verify_pv_size(&self, pv_name: &str, size_gi: u64) -> Result<()> {
        self.verify_pv_size_with(pv_name, size_gi, self.waits().pv_size)
    }

    pub fn verify_pv_size_with(
        &self,
        pv_name: &str,
        size_gi: u64,
        settings: WaitSettings,
    ) -> Result<()> {
        let cmd = format!("oc get pv {} -o=custom-columns=:.spec.capacity.storage", pv_name);

        let mut last = None;
        let mut waiter = settings.waiter();
        let matched = waiter.until(|_| {
            let out = self.run_checked(&cmd)?;
            let pv_size = out
                .split_whitespace()
                .next()
                .and_then(parse::parse_gi)
                .ok_or_else(|| Error::unexpected_output(&cmd, out.as_str(), "expected a Gi quantity"))?;
            if pv_size == size_gi {
                info!(pv = pv_name, size_gi, "PV size verified");
                return Ok(Some(()));
            }
            last = Some(pv_size);
            Ok(None)
        })?;

        matched.ok_or_else(|| {
            error!(pv = pv_name, size_gi, last = ?last, "Verification of pv size failed");
            Error::timeout(
                format!("resize of PV '{}' to {}Gi", pv_name, size_gi),
                settings.timeout(),
            )
        })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Wait until at least one event matches `filter`
    pub fn wait_for_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.wait_for_events_with(filter, self.waits().events)
    }

    pub fn wait_for_events_with(
        &self,
        filter: &EventFilter,
        settings: WaitSettings,
    ) -> Result<Vec<Event>> {
        let mut waiter = settings.waiter();
        let events = waiter.until(|_| {
            let events = self.get_events(filter)?;
            Ok((!events.is_empty()).then_some(events))
        })?;

        events.ok_or_else(|| {
            error!(timeout_secs = settings.timeout_secs, "Exceeded timeout waiting for events");
            Error::timeout(
                format!("events matching '{}'", filter.field_selector()),
                settings.timeout(),
            )
        })
    }
}
