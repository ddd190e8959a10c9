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

// Cluster event exporter with pluggable sinks
//
// Takes batches of cluster events and exports them to one or more backends:
// - Elasticsearch, through either the v2 or the v5 client generation
// - Kafka, one JSON message per event
// - the process log
//
// Each sink is selected and configured by a `<name>:<uri>` string.

pub mod config;
pub mod elasticsearch;
pub mod error;
pub mod event;
pub mod kafka;
pub mod point;
pub mod sinks;

// Re-export main types
pub use config::uri::SinkUri;
pub use config::{load_config, load_config_with_env, ExporterConfig};
pub use elasticsearch::{ElasticSearchService, EsClient, EsConfig, EsVersion, SearchBackend};
pub use error::{ConfigError, ConfigIssue, ConversionError, DeliveryError, FlushError, SinkError};
pub use event::{Event, EventBatch, EventSource, EventType, ObjectKind, ObjectMeta, ObjectReference};
pub use kafka::{KafkaConfig, KafkaProducer, MessageProducer};
pub use point::{es_point, event_tags, kafka_point, EsSinkPoint, KafkaSinkPoint};
pub use sinks::{
    ElasticSearchSink, EventSink, ExportSummary, KafkaSink, LogSink, SinkFactory, SinkManager,
};
