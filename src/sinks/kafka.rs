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
use crate::config::uri::SinkUri;
use crate::error::{ConversionError, DeliveryError, SinkError};
use crate::event::{Event, EventBatch};
use crate::kafka::{KafkaConfig, KafkaProducer, MessageProducer};
use crate::point::kafka_point;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Every message goes to this partition
const PARTITION: i32 = 0;

pub struct KafkaSink {
    producer: Arc<dyn MessageProducer>,
    topic: String,
    lock: RwLock<()>,
}

impl KafkaSink {
    pub fn new(producer: Arc<dyn MessageProducer>, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
            lock: RwLock::new(()),
        }
    }

    /// Options are validated before any broker is contacted.
    pub async fn from_uri(uri: &SinkUri) -> Result<Self, SinkError> {
        let config = KafkaConfig::from_uri(uri).map_err(|e| {
            warn!("Failed to parse Kafka sink options: {}", e);
            e
        })?;
        let producer = KafkaProducer::connect(&config).await.map_err(|e| {
            warn!("Failed to create Kafka sink: {}", e);
            e
        })?;
        info!("Kafka sink setup successfully, topic: {}", config.topic);
        Ok(Self::new(Arc::new(producer), config.topic))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn export_event(&self, event: &Event) -> Result<(), ExportFailure> {
        let point = kafka_point(event).map_err(ExportFailure::Convert)?;
        let payload =
            serde_json::to_vec(&point).map_err(|e| ExportFailure::Deliver(e.into()))?;

        let start = Instant::now();
        self.producer
            .produce(&self.topic, PARTITION, payload)
            .await
            .map_err(ExportFailure::Deliver)?;
        debug!(
            "Produced event {} to {}:{} in {:?}",
            event.uid(),
            self.topic,
            PARTITION,
            start.elapsed()
        );
        Ok(())
    }
}

enum ExportFailure {
    Convert(ConversionError),
    Deliver(DeliveryError),
}

#[async_trait]
impl EventSink for KafkaSink {
    async fn export_events(&self, batch: &EventBatch) -> ExportSummary {
        let _guard = self.lock.write().await;
        let mut summary = ExportSummary::new(batch.len());

        for event in &batch.events {
            match self.export_event(event).await {
                Ok(()) => summary.delivered += 1,
                Err(ExportFailure::Convert(e)) => {
                    warn!("Failed to convert event to point: {}", e);
                    summary.failed += 1;
                }
                Err(ExportFailure::Deliver(e)) => {
                    warn!("Failed to produce event {} to Kafka: {}", event.uid(), e);
                    summary.failed += 1;
                }
            }
        }

        match self.producer.flush().await {
            Ok(()) => summary.flushed = true,
            Err(e) => warn!("Failed to flush Kafka producer: {}", e),
        }

        summary
    }

    fn name(&self) -> &'static str {
        "Apache Kafka Sink"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlushError;
    use crate::event::{EventSource, ObjectKind, ObjectMeta, ObjectReference};
    use crate::point::KafkaSinkPoint;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingProducer {
        sent: Mutex<Vec<(String, i32, Vec<u8>)>>,
        flushes: Mutex<usize>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl MessageProducer for RecordingProducer {
        async fn produce(
            &self,
            topic: &str,
            partition: i32,
            payload: Vec<u8>,
        ) -> Result<(), DeliveryError> {
            let mut sent = self.sent.lock().unwrap();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(DeliveryError::Transport("broker unavailable".to_string()));
            }
            sent.push((topic.to_string(), partition, payload));
            Ok(())
        }

        async fn flush(&self) -> Result<(), FlushError> {
            *self.flushes.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn event(uid: &str) -> Event {
        Event {
            metadata: ObjectMeta {
                uid: uid.to_string(),
                name: "web-1.17f".to_string(),
                namespace: "default".to_string(),
                ..Default::default()
            },
            involved_object: ObjectReference {
                kind: ObjectKind::Pod,
                name: "web-1".to_string(),
                uid: "pod-1".to_string(),
                ..Default::default()
            },
            reason: "BackOff".to_string(),
            message: "Back-off restarting failed container".to_string(),
            source: EventSource {
                component: "kubelet".to_string(),
                host: "node-a".to_string(),
            },
            first_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            last_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 9, 5, 0).unwrap(),
            count: 4,
            event_type: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_produces_points_to_partition_zero() {
        let producer = Arc::new(RecordingProducer::default());
        let sink = KafkaSink::new(producer.clone(), "cluster-events");
        let batch = EventBatch::new(Utc::now(), vec![event("e-1"), event("e-2")]);

        let summary = sink.export_events(&batch).await;

        assert!(summary.is_clean());
        assert_eq!(summary.delivered, 2);
        assert_eq!(*producer.flushes.lock().unwrap(), 1);

        let sent = producer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "cluster-events");
        assert_eq!(sent[0].1, 0);

        let point: KafkaSinkPoint = serde_json::from_slice(&sent[0].2).unwrap();
        assert_eq!(point.event_timestamp, batch.events[0].last_timestamp);
        assert_eq!(point.event_tags["eventID"], "e-1");
        assert_eq!(point.event_tags["pod_id"], "pod-1");
        assert!(point.event_value.contains("BackOff"));
    }

    #[tokio::test]
    async fn test_broker_failure_counts_remaining_events() {
        let producer = Arc::new(RecordingProducer {
            fail_after: Some(1),
            ..Default::default()
        });
        let sink = KafkaSink::new(producer.clone(), "cluster-events");
        let batch = EventBatch::new(Utc::now(), vec![event("e-1"), event("e-2"), event("e-3")]);

        let summary = sink.export_events(&batch).await;

        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.failed, 2);
        assert!(summary.flushed);
    }

    #[tokio::test]
    async fn test_event_without_uid_is_not_produced() {
        let producer = Arc::new(RecordingProducer::default());
        let sink = KafkaSink::new(producer.clone(), "cluster-events");
        let batch = EventBatch::new(Utc::now(), vec![event(""), event("e-2")]);

        let summary = sink.export_events(&batch).await;

        assert_eq!(summary.failed, 1);
        assert_eq!(producer.sent.lock().unwrap().len(), 1);
        assert_eq!(sink.name(), "Apache Kafka Sink");
    }

    /// Tracks how many `produce` calls overlap.
    #[derive(Default)]
    struct OverlapProducer {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl MessageProducer for OverlapProducer {
        async fn produce(&self, _: &str, _: i32, _: Vec<u8>) -> Result<(), DeliveryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        async fn flush(&self) -> Result<(), FlushError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_batches_are_serialized() {
        let producer = Arc::new(OverlapProducer::default());
        let sink = KafkaSink::new(producer.clone(), "cluster-events");
        let first = EventBatch::new(Utc::now(), vec![event("e-1"), event("e-2")]);
        let second = EventBatch::new(Utc::now(), vec![event("e-3"), event("e-4")]);

        let (a, b) = tokio::join!(sink.export_events(&first), sink.export_events(&second));

        assert_eq!(a.delivered + b.delivered, 4);
        assert_eq!(producer.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_brokers_fails_before_connecting() {
        let uri = SinkUri::parse("?eventstopic=cluster-events").unwrap();
        let err = KafkaSink::from_uri(&uri).await.err().unwrap();
        assert!(err.as_config().is_some());
    }
}
