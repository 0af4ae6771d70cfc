//! Cluster Events
//!
//! Field-selector filters and typed records for `oc get events -o yaml`.

use super::OcClient;
use crate::error::Result;
use crate::remote::CommandRunner;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

// =============================================================================
// Filter
// =============================================================================

/// Event query; unset fields do not constrain the result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Name of the involved object
    pub obj_name: Option<String>,
    /// Namespace of the involved object
    pub obj_namespace: Option<String>,
    /// Kind of the involved object, e.g. `PersistentVolumeClaim`
    pub obj_type: Option<String>,
    /// Event reason, e.g. `ProvisioningFailed`
    pub event_reason: Option<String>,
    /// `Normal` or `Warning`
    pub event_type: Option<String>,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.obj_name = Some(name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.obj_namespace = Some(namespace.into());
        self
    }

    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.obj_type = Some(kind.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.event_reason = Some(reason.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Value for `--field-selector`; `''` when nothing is set
    pub fn field_selector(&self) -> String {
        let selectors: Vec<String> = [
            ("involvedObject.name", &self.obj_name),
            ("involvedObject.namespace", &self.obj_namespace),
            ("involvedObject.kind", &self.obj_type),
            ("reason", &self.event_reason),
            ("type", &self.event_type),
        ]
        .iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", field, v))
        })
        .collect();

        if selectors.is_empty() {
            "''".to_string()
        } else {
            selectors.join(",")
        }
    }

    /// Full `oc get events` command for this filter
    pub fn command(&self) -> String {
        format!("oc get events -o yaml --field-selector {}", self.field_selector())
    }
}

// =============================================================================
// Event Records
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvolvedObject {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    #[serde(default)]
    pub component: Option<String>,
}

/// One cluster event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub involved_object: InvolvedObject,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub metadata: EventMetadata,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub source: EventSource,
    #[serde(rename = "type", default)]
    pub event_type: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

/// Parse the YAML list returned by `oc get events -o yaml`
pub fn parse_events(yaml: &str) -> Result<Vec<Event>> {
    let list: EventList = serde_yaml::from_str(yaml)?;
    Ok(list.items)
}

impl<R: CommandRunner> OcClient<R> {
    /// Events matching `filter`
    pub fn get_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let out = self.run_checked(&filter.command())?;
        let events = parse_events(&out)?;
        debug!(count = events.len(), selector = %filter.field_selector(), "Fetched events");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const EVENTS_YAML: &str = r#"
apiVersion: v1
items:
- apiVersion: v1
  involvedObject:
    kind: PersistentVolumeClaim
    name: autotests-pvc-abc
    namespace: storage
  message: 'Failed to provision volume with StorageClass "sc1": heketi down'
  metadata:
    creationTimestamp: 2018-10-19T18:27:09Z
    name: autotests-pvc-abc.155f15db4e72cc2e
    namespace: storage
  reason: ProvisioningFailed
  reportingComponent: ""
  reportingInstance: ""
  source:
    component: persistentvolume-controller
  type: Warning
kind: List
metadata:
  resourceVersion: ""
"#;

    #[test]
    fn test_field_selector_empty() {
        assert_eq!(EventFilter::new().field_selector(), "''");
    }

    #[test]
    fn test_field_selector_order() {
        let filter = EventFilter::new()
            .event_type("Warning")
            .name("claim1")
            .kind("PersistentVolumeClaim")
            .reason("ProvisioningFailed");
        assert_eq!(
            filter.command(),
            "oc get events -o yaml --field-selector \
             involvedObject.name=claim1,involvedObject.kind=PersistentVolumeClaim,\
             reason=ProvisioningFailed,type=Warning"
        );
    }

    #[test]
    fn test_parse_events() {
        let events = parse_events(EVENTS_YAML).unwrap();
        assert_eq!(events.len(), 1);

        let event = &events[0];
        assert_eq!(event.reason, "ProvisioningFailed");
        assert_eq!(event.event_type, "Warning");
        assert_eq!(event.involved_object.name, "autotests-pvc-abc");
        assert_eq!(
            event.metadata.creation_timestamp,
            Some(Utc.with_ymd_and_hms(2018, 10, 19, 18, 27, 9).unwrap())
        );
        assert_eq!(
            event.source.component.as_deref(),
            Some("persistentvolume-controller")
        );
    }

    #[test]
    fn test_get_events_runs_selector() {
        let mock = crate::remote::MockRunner::new();
        mock.push_ok(EVENTS_YAML);
        let client = OcClient::new(mock.clone(), "master");

        let events = client
            .get_events(&EventFilter::new().reason("ProvisioningFailed"))
            .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(
            mock.executed_commands(),
            vec!["oc get events -o yaml --field-selector reason=ProvisioningFailed"]
        );
    }

    #[test]
    fn test_parse_empty_list() {
        let events = parse_events("apiVersion: v1\nitems: []\nkind: List\n").unwrap();
        assert!(events.is_empty());
    }
}
