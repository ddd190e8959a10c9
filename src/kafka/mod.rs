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

// Kafka producer service

pub mod config;

pub use config::{Compression, KafkaConfig, SaslPlain, TlsConfig, DEFAULT_TOPIC};

use crate::error::{DeliveryError, FlushError, SinkError};
use async_trait::async_trait;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info};

const BACKEND: &str = "Kafka";
const CLIENT_ID: &str = "kafka-sink";
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Write side of a message broker, as seen by the sink
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Publish one message and wait for the broker's acknowledgement.
    async fn produce(
        &self,
        topic: &str,
        partition: i32,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError>;

    /// Wait for every in-flight message to be acknowledged.
    async fn flush(&self) -> Result<(), FlushError>;
}

pub struct KafkaProducer {
    producer: FutureProducer,
    brokers: Vec<String>,
}

impl KafkaProducer {
    /// Creates the producer and checks that the brokers answer within the
    /// dial timeout.
    pub async fn connect(config: &KafkaConfig) -> Result<Self, SinkError> {
        debug!("Setting up Kafka producer for brokers {:?}", config.brokers);

        let producer: FutureProducer = client_config(config).create().map_err(|e| {
            SinkError::connection(BACKEND, format!("failed to create producer: {}", e))
        })?;

        let probe = producer.clone();
        tokio::task::spawn_blocking(move || {
            probe
                .client()
                .fetch_metadata(None, DIAL_TIMEOUT)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| SinkError::connection(BACKEND, e))?
        .map_err(|e| {
            SinkError::connection(BACKEND, format!("failed to connect to kafka cluster: {}", e))
        })?;

        info!("Kafka producer connected to {:?}", config.brokers);
        Ok(Self {
            producer,
            brokers: config.brokers.clone(),
        })
    }

    pub fn brokers(&self) -> &[String] {
        &self.brokers
    }
}

/// librdkafka settings for a sink producer
pub fn client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.brokers.join(","))
        .set("client.id", CLIENT_ID)
        .set(
            "socket.connection.setup.timeout.ms",
            DIAL_TIMEOUT.as_millis().to_string(),
        )
        .set("acks", "1")
        .set("retries", "1")
        .set("retry.backoff.ms", "0")
        .set("compression.codec", config.compression.as_str())
        .set_log_level(RDKafkaLogLevel::Warning);

    let protocol = match (&config.sasl, &config.tls) {
        (Some(_), Some(_)) => "SASL_SSL",
        (Some(_), None) => "SASL_PLAINTEXT",
        (None, Some(_)) => "SSL",
        (None, None) => "PLAINTEXT",
    };
    client_config.set("security.protocol", protocol);

    if let Some(sasl) = &config.sasl {
        client_config
            .set("sasl.mechanisms", "PLAIN")
            .set("sasl.username", &sasl.username)
            .set("sasl.password", &sasl.password);
    }

    if let Some(tls) = &config.tls {
        if let Some(ca_cert) = &tls.ca_cert {
            client_config.set("ssl.ca.location", ca_cert);
        }
        if let (Some(cert), Some(key)) = (&tls.client_cert, &tls.client_key) {
            client_config
                .set("ssl.certificate.location", cert)
                .set("ssl.key.location", key);
        }
        if tls.insecure_skip_verify {
            client_config.set("enable.ssl.certificate.verification", "false");
        }
    }

    client_config
}

#[async_trait]
impl MessageProducer for KafkaProducer {
    async fn produce(
        &self,
        topic: &str,
        partition: i32,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let record = FutureRecord::<(), _>::to(topic)
            .partition(partition)
            .payload(&payload);

        self.producer
            .send(record, DIAL_TIMEOUT)
            .await
            .map(|_| ())
            .map_err(|(e, _)| {
                DeliveryError::Transport(format!(
                    "failed to produce message to {}:{}: {}",
                    topic, partition, e
                ))
            })
    }

    async fn flush(&self) -> Result<(), FlushError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || {
            producer.flush(FLUSH_TIMEOUT).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| FlushError::Producer(e.to_string()))?
        .map_err(FlushError::Producer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(raw: &str) -> KafkaConfig {
        KafkaConfig::from_uri(&crate::config::uri::SinkUri::parse(raw).unwrap()).unwrap()
    }

    #[test]
    fn test_client_config_plaintext() {
        let client_config = client_config(&config("?brokers=k1:9092&brokers=k2:9092"));
        assert_eq!(client_config.get("bootstrap.servers"), Some("k1:9092,k2:9092"));
        assert_eq!(client_config.get("client.id"), Some(CLIENT_ID));
        assert_eq!(client_config.get("security.protocol"), Some("PLAINTEXT"));
        assert_eq!(client_config.get("acks"), Some("1"));
        assert_eq!(client_config.get("compression.codec"), Some("none"));
    }

    #[test]
    fn test_client_config_sasl_ssl() {
        let client_config = client_config(&config(
            "?brokers=k1:9093&user=svc&password=pw&insecuressl=true&compression=zstd",
        ));
        assert_eq!(client_config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(client_config.get("sasl.username"), Some("svc"));
        assert_eq!(
            client_config.get("enable.ssl.certificate.verification"),
            Some("false")
        );
        assert_eq!(client_config.get("compression.codec"), Some("zstd"));
    }
}
