// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Cluster event data model
//
// Mirrors the shape of a Kubernetes `Event` closely enough that batches
// serialized by the upstream collector deserialize without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of object an event concerns
///
/// Kinds the exporter treats specially get their own variant; everything
/// else round-trips through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Pod,
    Node,
    Service,
    ReplicaSet,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    Other(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Pod => "Pod",
            ObjectKind::Node => "Node",
            ObjectKind::Service => "Service",
            ObjectKind::ReplicaSet => "ReplicaSet",
            ObjectKind::Deployment => "Deployment",
            ObjectKind::StatefulSet => "StatefulSet",
            ObjectKind::DaemonSet => "DaemonSet",
            ObjectKind::Job => "Job",
            ObjectKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ObjectKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "Pod" => ObjectKind::Pod,
            "Node" => ObjectKind::Node,
            "Service" => ObjectKind::Service,
            "ReplicaSet" => ObjectKind::ReplicaSet,
            "Deployment" => ObjectKind::Deployment,
            "StatefulSet" => ObjectKind::StatefulSet,
            "DaemonSet" => ObjectKind::DaemonSet,
            "Job" => ObjectKind::Job,
            _ => ObjectKind::Other(kind),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl Default for ObjectKind {
    fn default() -> Self {
        ObjectKind::Other(String::new())
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event severity
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    #[default]
    Normal,
    Warning,
    Other(String),
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Normal" => EventType::Normal,
            "Warning" => EventType::Warning,
            _ => EventType::Other(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        match value {
            EventType::Normal => "Normal".to_string(),
            EventType::Warning => "Warning".to_string(),
            EventType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Reference to the object an event is about
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_path: String,
}

/// Component and host that reported an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSource {
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub host: String,
}

/// One cluster occurrence, as reported by the upstream collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub metadata: ObjectMeta,
    pub involved_object: ObjectReference,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub source: EventSource,
    pub first_timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub count: i32,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
}

impl Event {
    /// Unique identifier of the event itself
    pub fn uid(&self) -> &str {
        &self.metadata.uid
    }
}

/// Events collected over one export interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(timestamp: DateTime<Utc>, events: Vec<Event>) -> Self {
        Self { timestamp, events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_kind_round_trips_unknown_kinds() {
        let kind: ObjectKind = "CronJob".to_string().into();
        assert_eq!(kind, ObjectKind::Other("CronJob".to_string()));
        assert_eq!(String::from(kind), "CronJob");

        let pod: ObjectKind = "Pod".to_string().into();
        assert_eq!(pod, ObjectKind::Pod);
    }

    #[test]
    fn test_object_kind_is_case_sensitive() {
        let kind: ObjectKind = "pod".to_string().into();
        assert_eq!(kind, ObjectKind::Other("pod".to_string()));
    }

    #[test]
    fn test_deserialize_kubernetes_event() {
        let raw = r#"{
            "metadata": {"name": "web-1.17a", "namespace": "default", "uid": "e-1"},
            "involvedObject": {"kind": "Pod", "namespace": "default", "name": "web-1", "uid": "p-1"},
            "reason": "BackOff",
            "message": "Back-off restarting failed container",
            "source": {"component": "kubelet", "host": "node-a"},
            "firstTimestamp": "2025-03-01T10:00:00Z",
            "lastTimestamp": "2025-03-01T10:05:00Z",
            "count": 4,
            "type": "Warning"
        }"#;

        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.uid(), "e-1");
        assert_eq!(event.involved_object.kind, ObjectKind::Pod);
        assert_eq!(event.source.host, "node-a");
        assert_eq!(event.count, 4);
        assert_eq!(event.event_type, EventType::Warning);
    }

    #[test]
    fn test_event_type_serializes_as_string() {
        let value = serde_json::to_value(EventType::Other("Critical".to_string())).unwrap();
        assert_eq!(value, serde_json::json!("Critical"));
    }
}
