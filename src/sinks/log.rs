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

use super::{EventSink, ExportSummary};
use crate::event::{Event, EventBatch};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

/// Writes every batch to the process log. Useful for debugging a pipeline
/// without a backend.
#[derive(Default)]
pub struct LogSink {
    lock: RwLock<()>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn batch_header(batch: &EventBatch) -> String {
    format!(
        "EventBatch    Timestamp: {}    Events: {}",
        batch.timestamp.to_rfc3339(),
        batch.len()
    )
}

pub(crate) fn event_line(event: &Event) -> String {
    format!(
        "{} {}/{} {} (cnt:{}): {}",
        event.last_timestamp.to_rfc3339(),
        event.involved_object.kind,
        event.involved_object.name,
        event.reason,
        event.count,
        event.message
    )
}

#[async_trait]
impl EventSink for LogSink {
    async fn export_events(&self, batch: &EventBatch) -> ExportSummary {
        let _guard = self.lock.write().await;

        info!("{}", batch_header(batch));
        for event in &batch.events {
            info!("{}", event_line(event));
        }

        ExportSummary {
            total: batch.len(),
            delivered: batch.len(),
            failed: 0,
            flushed: true,
        }
    }

    fn name(&self) -> &'static str {
        "Log Sink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ObjectKind, ObjectReference};
    use chrono::{TimeZone, Utc};

    fn event() -> Event {
        Event {
            involved_object: ObjectReference {
                kind: ObjectKind::Deployment,
                name: "api".to_string(),
                ..Default::default()
            },
            reason: "ScalingReplicaSet".to_string(),
            message: "Scaled up replica set api-7d9 to 3".to_string(),
            count: 2,
            last_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn test_event_line_format() {
        assert_eq!(
            event_line(&event()),
            "2025-03-01T12:00:00+00:00 Deployment/api ScalingReplicaSet (cnt:2): Scaled up replica set api-7d9 to 3"
        );
    }

    #[tokio::test]
    async fn test_log_sink_accepts_every_event() {
        let sink = LogSink::new();
        let batch = EventBatch::new(Utc::now(), vec![event(), event()]);

        let summary = sink.export_events(&batch).await;

        assert!(summary.is_clean());
        assert_eq!(summary.delivered, 2);
        assert!(batch_header(&batch).ends_with("Events: 2"));
        assert_eq!(sink.name(), "Log Sink");
    }
}
