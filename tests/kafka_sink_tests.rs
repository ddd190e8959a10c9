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

// Kafka sink integration tests
// Live tests require a broker; set EXPORTER_TEST_KAFKA_BROKERS (e.g. 127.0.0.1:9092)

mod common;

use chrono::Utc;
use common::pod_event;
use event_exporter::kafka::{client_config, Compression};
use event_exporter::{EventBatch, EventSink, KafkaConfig, KafkaSink, SinkError, SinkUri};
use std::env;

fn test_brokers() -> Option<String> {
    env::var("EXPORTER_TEST_KAFKA_BROKERS").ok()
}

#[test]
fn test_config_from_scenario_uri() {
    let uri = SinkUri::parse(
        "?brokers=k1:9092&brokers=k2:9092&eventstopic=cluster-events&compression=snappy",
    )
    .unwrap();
    let config = KafkaConfig::from_uri(&uri).unwrap();

    assert_eq!(config.brokers, vec!["k1:9092", "k2:9092"]);
    assert_eq!(config.topic, "cluster-events");
    assert_eq!(config.compression, Compression::Snappy);

    let client_config = client_config(&config);
    assert_eq!(client_config.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
    assert_eq!(client_config.get("compression.codec"), Some("snappy"));
}

#[tokio::test]
async fn test_unreachable_brokers_is_connection_error() {
    // Nothing listens on the discard port; metadata fetch times out.
    let uri = SinkUri::parse("?brokers=127.0.0.1:9").unwrap();
    let err = KafkaSink::from_uri(&uri).await.err().unwrap();

    assert!(matches!(err, SinkError::Connection { backend: "Kafka", .. }));
}

#[tokio::test]
async fn test_live_export() {
    let Some(brokers) = test_brokers() else {
        eprintln!("Skipping test: EXPORTER_TEST_KAFKA_BROKERS not set");
        return;
    };

    let uri = SinkUri::parse(&format!(
        "?brokers={}&eventstopic=event-exporter-test",
        brokers
    ))
    .unwrap();
    let sink = KafkaSink::from_uri(&uri).await.expect("Failed to create Kafka sink");
    assert_eq!(sink.topic(), "event-exporter-test");

    let batch = EventBatch::new(
        Utc::now(),
        vec![pod_event("e-1", "web-0"), pod_event("e-2", "web-1")],
    );
    let summary = sink.export_events(&batch).await;

    assert!(summary.is_clean(), "{:?}", summary);
    assert_eq!(summary.delivered, 2);
}
