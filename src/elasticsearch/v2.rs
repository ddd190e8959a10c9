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

// Client for Elasticsearch 2.x servers

use super::config::ClientSettings;
use super::transport::{BulkResponse, Payload, Transport, TransportError};
use regex::Regex;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::OnceLock;

pub struct ClientV2 {
    transport: Transport,
    settings: ClientSettings,
}

impl ClientV2 {
    pub async fn new_client(settings: ClientSettings) -> Result<Self, TransportError> {
        let mut transport = Transport::new(&settings).map_err(|source| TransportError::Http {
            url: settings.urls.join(","),
            source,
        })?;

        if settings.healthcheck {
            transport
                .startup_healthcheck(settings.healthcheck_timeout_startup)
                .await?;
        }
        if settings.sniff {
            let nodes = transport.sniff(publish_address).await?;
            transport.set_nodes(nodes);
        }

        Ok(Self {
            transport,
            settings,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn nodes(&self) -> &[String] {
        self.transport.nodes()
    }

    pub async fn index_exists(&self, index: &str) -> Result<bool, TransportError> {
        let path = format!("/{}", index);
        let response = self.transport.perform(Method::HEAD, &path, None).await?;
        match response.status {
            StatusCode::NOT_FOUND => Ok(false),
            _ => response.into_success(Method::HEAD, &path).map(|_| true),
        }
    }

    pub async fn create_index(
        &self,
        index: &str,
        alias: &str,
        record_type: &str,
    ) -> Result<(), TransportError> {
        let path = format!("/{}", index);
        let payload = Payload {
            content_type: "application/json",
            data: index_body(alias, record_type).to_string(),
        };
        let response = self
            .transport
            .perform(Method::PUT, &path, Some(&payload))
            .await?;

        // Losing a creation race to another exporter is fine.
        if response.status == StatusCode::BAD_REQUEST
            && response.body.contains("index_already_exists_exception")
        {
            return Ok(());
        }
        response.into_success(Method::PUT, &path).map(|_| ())
    }

    pub fn bulk_action(index: &str, record_type: &str, id: &str) -> Value {
        json!({ "index": { "_index": index, "_type": record_type, "_id": id } })
    }

    pub async fn bulk(&self, body: String) -> Result<BulkResponse, TransportError> {
        let payload = Payload {
            content_type: "application/json",
            data: body,
        };
        let response = self
            .transport
            .perform(Method::POST, "/_bulk", Some(&payload))
            .await?
            .into_success(Method::POST, "/_bulk")?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

fn index_body(alias: &str, record_type: &str) -> Value {
    json!({
        "aliases": { alias: {} },
        "mappings": {
            record_type: {
                "dynamic_templates": [{
                    "strings": {
                        "match_mapping_type": "string",
                        "mapping": { "type": "string", "index": "not_analyzed" }
                    }
                }],
                "properties": {
                    "Message": { "type": "string", "index": "analyzed" }
                }
            }
        }
    })
}

/// 2.x nodes report `inet[hostname/ip:port]`, or plain `ip:port` once
/// bound to a single address.
pub fn publish_address(raw: &str) -> Option<String> {
    static INET: OnceLock<Regex> = OnceLock::new();
    let inet = INET.get_or_init(|| {
        Regex::new(r"^inet\[[^/]*/([^\]]+)\]$").expect("publish address pattern is valid")
    });

    if let Some(caps) = inet.captures(raw) {
        return Some(caps[1].to_string());
    }
    if raw.contains(':') && !raw.contains('[') {
        return Some(raw.to_string());
    }
    None
}
