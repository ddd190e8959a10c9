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

// Shared helpers for integration tests
//
// `FakeElasticsearch` is a minimal HTTP/1.1 server on a local port. It
// records every request and answers with whatever the test handler returns.
// Every response closes the connection.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use event_exporter::{Event, EventSource, ObjectKind, ObjectMeta, ObjectReference};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub type Handler = Arc<dyn Fn(&Recorded) -> (u16, String) + Send + Sync>;

pub struct FakeElasticsearch {
    listener: Option<TcpListener>,
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
    task: Option<JoinHandle<()>>,
}

impl FakeElasticsearch {
    /// Bind a local port without serving yet, so handlers can refer to it.
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        Self {
            listener: Some(listener),
            addr,
            requests: Arc::new(Mutex::new(Vec::new())),
            task: None,
        }
    }

    /// Bind and serve the default handler of a healthy, empty cluster.
    pub async fn start() -> Self {
        let mut server = Self::bind().await;
        server.serve(healthy_cluster);
        server
    }

    pub fn serve<F>(&mut self, handler: F)
    where
        F: Fn(&Recorded) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = self.listener.take().expect("server already started");
        let requests = self.requests.clone();
        let handler: Handler = Arc::new(handler);

        self.task = Some(tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let requests = requests.clone();
                let handler = handler.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, requests, handler).await;
                });
            }
        }));
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path_prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path.starts_with(path_prefix))
            .collect()
    }
}

impl Drop for FakeElasticsearch {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Answers like a reachable cluster with no indices yet.
pub fn healthy_cluster(request: &Recorded) -> (u16, String) {
    match (request.method.as_str(), request.path.as_str()) {
        ("HEAD", "/") => (200, String::new()),
        ("HEAD", _) => (404, String::new()),
        ("PUT", _) => (200, r#"{"acknowledged":true}"#.to_string()),
        ("POST", "/_bulk") => (200, bulk_ok(&request.body)),
        _ => (404, r#"{"error":"not found"}"#.to_string()),
    }
}

/// Successful bulk response with one item per action line.
pub fn bulk_ok(body: &str) -> String {
    let actions = body.lines().count() / 2;
    let items: Vec<String> = (0..actions)
        .map(|_| r#"{"index":{"status":201}}"#.to_string())
        .collect();
    format!(r#"{{"took":1,"errors":false,"items":[{}]}}"#, items.join(","))
}

async fn handle_connection(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<Recorded>>>,
    handler: Handler,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let recorded = Recorded {
        method,
        path,
        headers,
        body,
    };
    let (status, body) = handler(&recorded);
    let is_head = recorded.method == "HEAD";
    requests.lock().unwrap().push(recorded);

    let response = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        if is_head { 0 } else { body.len() },
        if is_head { "" } else { body.as_str() },
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

/// A pod event as the upstream collector would report it
pub fn pod_event(uid: &str, pod: &str) -> Event {
    Event {
        metadata: ObjectMeta {
            name: format!("{}.17f3a", pod),
            namespace: "default".to_string(),
            uid: uid.to_string(),
            ..Default::default()
        },
        involved_object: ObjectReference {
            kind: ObjectKind::Pod,
            namespace: "default".to_string(),
            name: pod.to_string(),
            uid: format!("{}-uid", pod),
            ..Default::default()
        },
        reason: "Pulled".to_string(),
        message: "Container image already present on machine".to_string(),
        source: EventSource {
            component: "kubelet".to_string(),
            host: "node-a".to_string(),
        },
        first_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        last_timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 0).unwrap(),
        count: 1,
        event_type: Default::default(),
    }
}
