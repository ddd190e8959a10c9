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

// Elasticsearch service
//
// Wraps whichever client generation the sink URI selected behind one
// save/flush interface. Records are buffered as bulk actions and sent
// when the buffer fills up or on flush.

pub mod config;
pub mod transport;
pub mod v2;
pub mod v5;

pub use config::{BasicAuth, ClientSettings, EsConfig, EsVersion, DEFAULT_CLUSTER_NAME};
pub use v2::ClientV2;
pub use v5::ClientV5;

use crate::config::uri::SinkUri;
use crate::error::{DeliveryError, FlushError, SinkError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};
use transport::{BulkResponse, TransportError};
use uuid::Uuid;

const BACKEND: &str = "Elasticsearch";

/// Write side of a search backend, as seen by the sink
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Queue `records` of `record_type` into the index for `date`.
    async fn save(
        &self,
        date: DateTime<Utc>,
        record_type: &str,
        records: Vec<Value>,
    ) -> Result<(), DeliveryError>;

    /// Send everything queued so far and wait for the outcome.
    async fn flush(&self) -> Result<(), FlushError>;

    fn cluster_name(&self) -> &str;
}

/// Exactly one live client, of the generation picked at construction
pub enum EsClient {
    V2(ClientV2),
    V5(ClientV5),
}

impl EsClient {
    pub async fn connect(version: EsVersion, settings: ClientSettings) -> Result<Self, SinkError> {
        let client = match version {
            EsVersion::V2 => ClientV2::new_client(settings).await.map(EsClient::V2),
            EsVersion::V5 => ClientV5::connect(settings).await.map(EsClient::V5),
        };
        client.map_err(|e| SinkError::connection(BACKEND, e))
    }

    pub fn version(&self) -> EsVersion {
        match self {
            EsClient::V2(_) => EsVersion::V2,
            EsClient::V5(_) => EsVersion::V5,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        match self {
            EsClient::V2(client) => client.settings(),
            EsClient::V5(client) => client.settings(),
        }
    }

    /// Nodes requests go to, after discovery
    pub fn nodes(&self) -> &[String] {
        match self {
            EsClient::V2(client) => client.nodes(),
            EsClient::V5(client) => client.nodes(),
        }
    }

    async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        match self {
            EsClient::V2(client) => client.index_exists(index).await,
            EsClient::V5(client) => client.exists(index).await,
        }
    }

    async fn create_index(
        &self,
        index: &str,
        alias: &str,
        record_type: &str,
    ) -> Result<(), TransportError> {
        match self {
            EsClient::V2(client) => client.create_index(index, alias, record_type).await,
            EsClient::V5(client) => client.create_index(index, alias, record_type).await,
        }
    }

    fn bulk_action(&self, index: &str, record_type: &str, id: &str) -> Value {
        match self {
            EsClient::V2(_) => ClientV2::bulk_action(index, record_type, id),
            EsClient::V5(_) => ClientV5::bulk_index_request(index, record_type, id),
        }
    }

    async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError> {
        match self {
            EsClient::V2(client) => client.bulk(body).await,
            EsClient::V5(client) => client.bulk_do(body).await,
        }
    }
}

#[derive(Default)]
struct BulkBuffer {
    body: String,
    actions: usize,
    known_indices: HashSet<String>,
}

impl BulkBuffer {
    fn clear(&mut self) {
        self.body.clear();
        self.actions = 0;
    }
}

pub struct ElasticSearchService {
    client: EsClient,
    cluster_name: String,
    index: String,
    bulk_actions: usize,
    buffer: Mutex<BulkBuffer>,
}

impl ElasticSearchService {
    pub async fn from_uri(uri: &SinkUri) -> Result<Self, SinkError> {
        let config = EsConfig::from_uri(uri)?;
        Self::connect(config).await
    }

    pub async fn connect(config: EsConfig) -> Result<Self, SinkError> {
        let client = EsClient::connect(config.version, config.client).await?;
        info!(
            "Elasticsearch {} client ready, nodes: {:?}, cluster: {}",
            client.version(),
            client.nodes(),
            config.cluster_name
        );

        Ok(Self {
            client,
            cluster_name: config.cluster_name,
            index: config.index,
            bulk_actions: config.bulk_actions,
            buffer: Mutex::new(BulkBuffer::default()),
        })
    }

    pub fn client(&self) -> &EsClient {
        &self.client
    }

    pub fn version(&self) -> EsVersion {
        self.client.version()
    }

    pub fn index_name(&self, date: DateTime<Utc>, record_type: &str) -> String {
        format!("{}-{}-{}", self.index, record_type, date.format("%Y.%m.%d"))
    }

    pub fn alias_name(&self, record_type: &str) -> String {
        format!("{}-{}", self.index, record_type)
    }

    async fn ensure_index(
        &self,
        known: &mut HashSet<String>,
        index: &str,
        record_type: &str,
    ) -> Result<(), TransportError> {
        if known.contains(index) {
            return Ok(());
        }
        if !self.client.index_exists(index).await? {
            info!("Creating Elasticsearch index '{}'", index);
            self.client
                .create_index(index, &self.alias_name(record_type), record_type)
                .await?;
        }
        known.insert(index.to_string());
        Ok(())
    }

    async fn send_bulk(&self, body: String, actions: usize) -> Result<(), FlushError> {
        let start = Instant::now();
        let response = self
            .client
            .bulk(body)
            .await
            .map_err(|e| FlushError::Transport(e.to_string()))?;

        let (failed, reason) = response.failures();
        if failed > 0 {
            return Err(FlushError::Rejected {
                failed,
                reason: reason.unwrap_or_default(),
            });
        }

        debug!(
            "Sent {} bulk actions to Elasticsearch in {:?}",
            actions,
            start.elapsed()
        );
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for ElasticSearchService {
    async fn save(
        &self,
        date: DateTime<Utc>,
        record_type: &str,
        records: Vec<Value>,
    ) -> Result<(), DeliveryError> {
        let index = self.index_name(date, record_type);
        let mut buffer = self.buffer.lock().await;

        self.ensure_index(&mut buffer.known_indices, &index, record_type)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        for record in records {
            let id = Uuid::new_v4().to_string();
            let action = self.client.bulk_action(&index, record_type, &id);
            buffer.body.push_str(&serde_json::to_string(&action)?);
            buffer.body.push('\n');
            buffer.body.push_str(&serde_json::to_string(&record)?);
            buffer.body.push('\n');
            buffer.actions += 1;
        }

        if buffer.actions >= self.bulk_actions {
            // Cleared only once the send completes, so a dropped save keeps it
            let result = self.send_bulk(buffer.body.clone(), buffer.actions).await;
            buffer.clear();
            result.map_err(|e| match e {
                FlushError::Rejected { .. } => DeliveryError::Rejected(e.to_string()),
                other => DeliveryError::Transport(other.to_string()),
            })?;
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), FlushError> {
        let mut buffer = self.buffer.lock().await;
        if buffer.actions == 0 {
            return Ok(());
        }
        let result = self.send_bulk(buffer.body.clone(), buffer.actions).await;
        buffer.clear();
        result
    }

    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }
}
