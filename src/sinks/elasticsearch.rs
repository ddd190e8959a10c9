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
use crate::elasticsearch::{ElasticSearchService, SearchBackend};
use crate::error::{ConversionError, DeliveryError, SinkError};
use crate::event::{Event, EventBatch};
use crate::point::es_point;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Record type events are stored under
pub const TYPE_NAME: &str = "events";

pub struct ElasticSearchSink {
    backend: Arc<dyn SearchBackend>,
    lock: RwLock<()>,
}

impl ElasticSearchSink {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            lock: RwLock::new(()),
        }
    }

    pub async fn from_uri(uri: &SinkUri) -> Result<Self, SinkError> {
        let service = ElasticSearchService::from_uri(uri).await.map_err(|e| {
            warn!("Failed to configure Elasticsearch sink: {}", e);
            e
        })?;
        info!("Elasticsearch sink setup successfully");
        Ok(Self::new(Arc::new(service)))
    }

    async fn export_event(&self, event: &Event) -> Result<(), ExportFailure> {
        let point =
            es_point(event, self.backend.cluster_name()).map_err(ExportFailure::Convert)?;
        let timestamp = point.last_occurrence_timestamp;
        let record =
            serde_json::to_value(&point).map_err(|e| ExportFailure::Deliver(e.into()))?;
        self.backend
            .save(timestamp, TYPE_NAME, vec![record])
            .await
            .map_err(ExportFailure::Deliver)
    }
}

enum ExportFailure {
    Convert(ConversionError),
    Deliver(DeliveryError),
}

#[async_trait]
impl EventSink for ElasticSearchSink {
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
                    warn!("Failed to export event {} to Elasticsearch: {}", event.uid(), e);
                    summary.failed += 1;
                }
            }
        }

        match self.backend.flush().await {
            Ok(()) => summary.flushed = true,
            Err(e) => warn!("Failed to flush data to Elasticsearch: {}", e),
        }

        summary
    }

    fn name(&self) -> &'static str {
        "ElasticSearch Sink"
    }
}
