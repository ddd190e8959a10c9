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

// Fan-out of one batch to every configured sink
//
// Each sink exports on its own task. The export timeout only bounds how long
// the manager waits; a sink that overruns it keeps running in the background
// and holds its own lock, so the next batch queues behind it.

use super::{EventSink, ExportSummary};
use crate::event::EventBatch;
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct SinkManager {
    sinks: Vec<Arc<dyn EventSink>>,
    timeout: Duration,
    /// Exports still running after the manager stopped waiting for them
    pending: Mutex<Vec<(&'static str, JoinHandle<ExportSummary>)>>,
}

impl SinkManager {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>, timeout: Duration) -> Self {
        Self {
            sinks,
            timeout,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn sinks(&self) -> &[Arc<dyn EventSink>] {
        &self.sinks
    }

    /// Export `batch` to every sink concurrently.
    ///
    /// Returns one entry per sink, in sink order. `None` means the sink did
    /// not finish within the export timeout; its export carries on and is
    /// awaited by [`SinkManager::stop`].
    pub async fn export_events(
        &self,
        batch: &EventBatch,
    ) -> Vec<(&'static str, Option<ExportSummary>)> {
        let batch = Arc::new(batch.clone());

        let exports = self.sinks.iter().map(|sink| {
            let name = sink.name();
            let task_sink = sink.clone();
            let task_batch = batch.clone();
            let mut handle =
                tokio::spawn(async move { task_sink.export_events(&task_batch).await });

            async move {
                match tokio::time::timeout(self.timeout, &mut handle).await {
                    Ok(Ok(summary)) => {
                        debug!(
                            "{} exported {}/{} events",
                            name, summary.delivered, summary.total
                        );
                        (name, Some(summary))
                    }
                    Ok(Err(e)) => {
                        warn!("{} export task failed: {}", name, e);
                        (name, None)
                    }
                    Err(_) => {
                        warn!(
                            "{} did not finish exporting within {:?}, no longer waiting",
                            name, self.timeout
                        );
                        self.track(name, handle);
                        (name, None)
                    }
                }
            }
        });

        join_all(exports).await
    }

    fn track(&self, name: &'static str, handle: JoinHandle<ExportSummary>) {
        match self.pending.lock() {
            Ok(mut pending) => {
                pending.retain(|(_, h)| !h.is_finished());
                pending.push((name, handle));
            }
            Err(e) => warn!("Pending export list poisoned, detaching {}: {}", name, e),
        }
    }

    /// Exports that overran the timeout and have not finished yet
    pub fn pending_exports(&self) -> usize {
        self.pending
            .lock()
            .map(|pending| pending.iter().filter(|(_, h)| !h.is_finished()).count())
            .unwrap_or(0)
    }

    /// Waits for overrunning exports, then stops every sink.
    pub async fn stop(&self) {
        let pending = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => Vec::new(),
        };
        for (name, handle) in pending {
            match handle.await {
                Ok(summary) => info!(
                    "{} finished a late export: {}/{} events delivered",
                    name, summary.delivered, summary.total
                ),
                Err(e) => warn!("{} export task failed: {}", name, e),
            }
        }

        for sink in &self.sinks {
            sink.stop().await;
            debug!("Stopped {}", sink.name());
        }
    }
}
