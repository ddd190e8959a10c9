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

// HTTP transport shared by both Elasticsearch client generations
//
// Round-robins requests over the node list, applies basic auth and retries
// transient failures on the next node with exponential backoff.

use super::config::{BasicAuth, ClientSettings};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const HEALTHCHECK_INTERVAL: Duration = Duration::from_secs(1);
const MIN_PING_TIMEOUT: Duration = Duration::from_millis(100);
const SNIFF_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no Elasticsearch node available")]
    NoNodeAvailable,

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: Method,
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct EsResponse {
    pub status: StatusCode,
    pub body: String,
}

impl EsResponse {
    pub fn into_success(self, method: Method, path: &str) -> Result<Self, TransportError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                method,
                path: path.to_string(),
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Request body with its content type
pub struct Payload {
    pub content_type: &'static str,
    pub data: String,
}

pub struct Transport {
    http: Client,
    nodes: Vec<String>,
    auth: Option<BasicAuth>,
    max_retries: u32,
    cursor: AtomicUsize,
}

impl Transport {
    pub fn new(settings: &ClientSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http,
            nodes: settings
                .urls
                .iter()
                .map(|u| u.trim_end_matches('/').to_string())
                .collect(),
            auth: settings.basic_auth.clone(),
            max_retries: settings.max_retries,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn set_nodes(&mut self, nodes: Vec<String>) {
        self.nodes = nodes;
        self.cursor.store(0, Ordering::Relaxed);
    }

    fn next_node(&self) -> Result<&str, TransportError> {
        if self.nodes.is_empty() {
            return Err(TransportError::NoNodeAvailable);
        }
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.nodes.len();
        Ok(&self.nodes[i])
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        }
    }

    /// Sends one request, retrying transient failures on the next node.
    ///
    /// Any non-retryable response, successful or not, is returned as is.
    pub async fn perform(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Payload>,
    ) -> Result<EsResponse, TransportError> {
        let mut attempt = 0;
        let mut delay = INITIAL_BACKOFF;

        loop {
            let url = format!("{}{}", self.next_node()?, path);
            let mut request = self.request(method.clone(), &url);
            if let Some(payload) = payload {
                request = request
                    .header(CONTENT_TYPE, payload.content_type)
                    .body(payload.data.clone());
            }

            let err = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(body) if !is_retryable(status) => {
                            return Ok(EsResponse { status, body });
                        }
                        Ok(body) => TransportError::Status {
                            method: method.clone(),
                            path: path.to_string(),
                            status,
                            body,
                        },
                        Err(source) => TransportError::Http { url, source },
                    }
                }
                Err(source) => TransportError::Http { url, source },
            };

            if attempt >= self.max_retries {
                if self.max_retries > 0 {
                    error!(
                        "Elasticsearch request {} {} failed after {} retries: {}",
                        method, path, attempt, err
                    );
                }
                return Err(err);
            }

            warn!(
                "Elasticsearch request {} {} failed (attempt {}/{}): {}. Retrying in {:?}",
                method,
                path,
                attempt + 1,
                self.max_retries,
                err,
                delay
            );
            sleep(delay).await;
            delay = (delay * 2).min(MAX_BACKOFF);
            attempt += 1;
        }
    }

    pub async fn ping(&self, node: &str, timeout: Duration) -> bool {
        match self
            .request(Method::HEAD, &format!("{}/", node))
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!("Node {} answered health check with {}", node, response.status());
                false
            }
            Err(e) => {
                debug!("Node {} failed health check: {}", node, e);
                false
            }
        }
    }

    /// Waits until any node answers, or `timeout` elapses.
    pub async fn startup_healthcheck(&self, timeout: Duration) -> Result<(), TransportError> {
        let deadline = Instant::now() + timeout;

        loop {
            for node in &self.nodes {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if self.ping(node, remaining.max(MIN_PING_TIMEOUT)).await {
                    return Ok(());
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::NoNodeAvailable);
            }
            sleep(remaining.min(HEALTHCHECK_INTERVAL)).await;
        }
    }

    /// Asks the configured nodes for the cluster's HTTP publish addresses.
    ///
    /// `extract` turns one `publish_address` into `host:port`; its format
    /// differs between server generations.
    pub async fn sniff(
        &self,
        extract: fn(&str) -> Option<String>,
    ) -> Result<Vec<String>, TransportError> {
        for node in &self.nodes {
            let url = format!("{}/_nodes/http", node);
            let response = match self
                .request(Method::GET, &url)
                .timeout(SNIFF_TIMEOUT)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!("Sniffing {} returned {}", url, response.status());
                    continue;
                }
                Err(e) => {
                    warn!("Sniffing {} failed: {}", url, e);
                    continue;
                }
            };

            let info: NodesInfo = match response.json().await {
                Ok(info) => info,
                Err(e) => {
                    warn!("Sniffing {} returned an unreadable body: {}", url, e);
                    continue;
                }
            };

            let scheme = Url::parse(node)
                .map(|u| u.scheme().to_string())
                .unwrap_or_else(|_| "http".to_string());
            let discovered: Vec<String> = info
                .nodes
                .values()
                .filter_map(|n| n.http.as_ref())
                .filter_map(|http| extract(&http.publish_address))
                .map(|address| format!("{}://{}", scheme, address))
                .collect();

            if !discovered.is_empty() {
                debug!("Discovered Elasticsearch nodes: {:?}", discovered);
                return Ok(discovered);
            }
        }

        Err(TransportError::NoNodeAvailable)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

#[derive(Debug, Deserialize)]
struct NodesInfo {
    #[serde(default)]
    nodes: BTreeMap<String, NodeInfo>,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(default)]
    http: Option<NodeHttp>,
}

#[derive(Debug, Deserialize)]
struct NodeHttp {
    publish_address: String,
}

/// Response of the `_bulk` endpoint
#[derive(Debug, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
pub struct BulkItem {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl BulkResponse {
    /// Number of failed items and the reason of the first one
    pub fn failures(&self) -> (usize, Option<String>) {
        if !self.errors {
            return (0, None);
        }

        let failed: Vec<&BulkItem> = self
            .items
            .iter()
            .flat_map(|item| item.values())
            .filter(|item| item.error.is_some() || item.status >= 300)
            .collect();

        let reason = failed.first().map(|item| match &item.error {
            Some(serde_json::Value::Object(error)) => error
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown")
                .to_string(),
            Some(other) => other.to_string(),
            None => format!("status {}", item.status),
        });

        (failed.len(), reason)
    }
}
