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

// Event to sink point conversion
//
// Points are built per event, handed to a backend and dropped. The search
// point borrows the event's nested objects; the broker point carries the
// whole event serialized as text.

use crate::error::ConversionError;
use crate::event::{Event, EventSource, ObjectKind, ObjectMeta, ObjectReference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TAG_EVENT_ID: &str = "eventID";
pub const TAG_HOSTNAME: &str = "hostname";
pub const TAG_POD_ID: &str = "pod_id";
pub const TAG_POD_NAME: &str = "pod_name";
pub const TAG_CLUSTER_NAME: &str = "cluster_name";

pub type Tags = BTreeMap<String, String>;

/// Document stored by the search backend
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EsSinkPoint<'a> {
    pub count: i32,
    pub metadata: &'a ObjectMeta,
    pub involved_object: &'a ObjectReference,
    pub source: &'a EventSource,
    pub first_occurrence_timestamp: DateTime<Utc>,
    pub last_occurrence_timestamp: DateTime<Utc>,
    pub message: &'a str,
    pub reason: &'a str,
    #[serde(rename = "Type")]
    pub event_type: String,
    pub event_tags: Tags,
}

/// Message published to the broker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KafkaSinkPoint {
    pub event_value: String,
    pub event_timestamp: DateTime<Utc>,
    pub event_tags: Tags,
}

/// Tags every point carries: event id, hostname, and pod identity for pod events.
pub fn event_tags(event: &Event) -> Result<Tags, ConversionError> {
    if event.uid().is_empty() {
        return Err(ConversionError::MissingEventId);
    }

    let mut tags = Tags::new();
    tags.insert(TAG_EVENT_ID.to_string(), event.uid().to_string());

    match &event.involved_object.kind {
        ObjectKind::Pod => {
            tags.insert(TAG_POD_ID.to_string(), event.involved_object.uid.clone());
            tags.insert(TAG_POD_NAME.to_string(), event.involved_object.name.clone());
        }
        ObjectKind::Node
        | ObjectKind::Service
        | ObjectKind::ReplicaSet
        | ObjectKind::Deployment
        | ObjectKind::StatefulSet
        | ObjectKind::DaemonSet
        | ObjectKind::Job
        | ObjectKind::Other(_) => {}
    }

    tags.insert(TAG_HOSTNAME.to_string(), event.source.host.clone());
    Ok(tags)
}

pub fn es_point<'a>(
    event: &'a Event,
    cluster_name: &str,
) -> Result<EsSinkPoint<'a>, ConversionError> {
    let mut tags = event_tags(event)?;
    tags.insert(TAG_CLUSTER_NAME.to_string(), cluster_name.to_string());

    Ok(EsSinkPoint {
        count: event.count,
        metadata: &event.metadata,
        involved_object: &event.involved_object,
        source: &event.source,
        first_occurrence_timestamp: event.first_timestamp,
        last_occurrence_timestamp: event.last_timestamp,
        message: &event.message,
        reason: &event.reason,
        event_type: event.event_type.clone().into(),
        event_tags: tags,
    })
}

pub fn kafka_point(event: &Event) -> Result<KafkaSinkPoint, ConversionError> {
    let event_tags = event_tags(event)?;
    let event_value =
        serde_json::to_string_pretty(event).map_err(|source| ConversionError::Serialize {
            uid: event.uid().to_string(),
            source,
        })?;

    Ok(KafkaSinkPoint {
        event_value,
        event_timestamp: event.last_timestamp,
        event_tags,
    })
}
