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

// Event sinks
//
// A sink converts each event of a batch into a backend record and
// delivers it. Per-event failures are logged and counted, never returned:
// one bad event must not cost the rest of the batch.

pub mod elasticsearch;
pub mod factory;
pub mod kafka;
pub mod log;
pub mod manager;

pub use elasticsearch::ElasticSearchSink;
pub use factory::SinkFactory;
pub use kafka::KafkaSink;
pub use log::LogSink;
pub use manager::SinkManager;

use crate::event::EventBatch;
use async_trait::async_trait;

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Export every event of `batch`, then flush once.
    ///
    /// Concurrent calls on the same sink are serialized.
    async fn export_events(&self, batch: &EventBatch) -> ExportSummary;

    /// Human-readable backend name
    fn name(&self) -> &'static str;

    /// Release resources. Sinks hold nothing that needs explicit teardown.
    async fn stop(&self) {}
}

/// Outcome of one `export_events` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub delivered: usize,
    pub failed: usize,
    pub flushed: bool,
}

impl ExportSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.flushed
    }
}
