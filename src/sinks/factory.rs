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

// Sink factory for creating sinks from `<name>:<uri>` selections

use super::{ElasticSearchSink, EventSink, KafkaSink, LogSink};
use crate::config::uri::SinkUri;
use crate::error::{ConfigIssue, SinkError};
use std::sync::Arc;
use tracing::info;

pub struct SinkFactory;

impl SinkFactory {
    /// Split a selection such as `kafka:?brokers=k1:9092` into sink name and URI.
    pub fn split(selection: &str) -> (&str, &str) {
        let selection = selection.trim();
        selection.split_once(':').unwrap_or((selection, ""))
    }

    /// Create one sink. Connection checks run here, so a returned sink is
    /// ready to export.
    pub async fn build(selection: &str) -> Result<Arc<dyn EventSink>, SinkError> {
        let (name, raw_uri) = Self::split(selection);
        let uri = SinkUri::parse(raw_uri)?;

        let sink: Arc<dyn EventSink> = match name {
            "elasticsearch" => Arc::new(ElasticSearchSink::from_uri(&uri).await?),
            "kafka" => Arc::new(KafkaSink::from_uri(&uri).await?),
            "log" => Arc::new(LogSink::new()),
            unknown => return Err(ConfigIssue::UnknownSink(unknown.to_string()).into()),
        };

        info!("Created sink: {}", sink.name());
        Ok(sink)
    }

    /// Create every selected sink, failing on the first one that cannot be built.
    pub async fn build_all<S: AsRef<str>>(
        selections: &[S],
    ) -> Result<Vec<Arc<dyn EventSink>>, SinkError> {
        let mut sinks = Vec::with_capacity(selections.len());
        for selection in selections {
            sinks.push(Self::build(selection.as_ref()).await?);
        }
        Ok(sinks)
    }
}
