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

// Elasticsearch sink options

use crate::config::uri::SinkUri;
use crate::error::{ConfigError, ConfigIssue};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_CLUSTER_NAME: &str = "default";
pub const DEFAULT_INDEX: &str = "heapster";
pub const DEFAULT_MAX_RETRIES: u32 = 0;
pub const DEFAULT_STARTUP_HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BULK_ACTIONS: usize = 1000;

/// Client protocol generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EsVersion {
    V2,
    #[default]
    V5,
}

impl EsVersion {
    pub fn from_number(version: u32) -> Option<Self> {
        match version {
            2 => Some(EsVersion::V2),
            5 => Some(EsVersion::V5),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            EsVersion::V2 => 2,
            EsVersion::V5 => 5,
        }
    }
}

impl fmt::Display for EsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.number())
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings shared by both client generations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub urls: Vec<String>,
    pub basic_auth: Option<BasicAuth>,
    pub max_retries: u32,
    pub healthcheck_timeout_startup: Duration,
    pub sniff: bool,
    pub healthcheck: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsConfig {
    pub client: ClientSettings,
    pub version: EsVersion,
    pub cluster_name: String,
    pub index: String,
    pub bulk_actions: usize,
}

impl EsConfig {
    pub fn from_uri(uri: &SinkUri) -> Result<Self, ConfigError> {
        let mut opts = uri.reader();

        // A host in the URI itself wins over any `nodes` in the query.
        let urls = match uri.endpoint() {
            Some(endpoint) => vec![endpoint.to_string()],
            None => opts.list("nodes"),
        };
        if urls.is_empty() {
            opts.issue(ConfigIssue::MissingEndpoint { key: "nodes" });
        }

        let basic_auth = match (opts.string("esUserName"), opts.string("esUserSecret")) {
            (Some(username), Some(password)) => Some(BasicAuth { username, password }),
            (Some(username), None) => Some(BasicAuth {
                username,
                password: String::new(),
            }),
            (None, Some(_)) => {
                opts.invalid(
                    "esUserSecret",
                    "<redacted>",
                    "esUserName must be set as well".to_string(),
                );
                None
            }
            (None, None) => None,
        };

        let max_retries = opts
            .parse::<u32>("maxRetries")
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let healthcheck_timeout_startup =
            opts.seconds("startupHealthcheckTimeout", DEFAULT_STARTUP_HEALTHCHECK_TIMEOUT);
        let sniff = opts.flag("sniff", true);
        let healthcheck = opts.flag("healthCheck", true);

        let version = match opts.parse::<u32>("ver") {
            Some(number) => EsVersion::from_number(number).unwrap_or_else(|| {
                opts.issue(ConfigIssue::UnsupportedVersion(number));
                EsVersion::default()
            }),
            None => EsVersion::default(),
        };

        let cluster_name = opts.string_or("cluster_name", DEFAULT_CLUSTER_NAME);
        let index = opts.string_or("index", DEFAULT_INDEX);

        let bulk_actions = match opts.parse::<usize>("bulkActions") {
            Some(0) => {
                opts.invalid("bulkActions", "0", "must be > 0".to_string());
                DEFAULT_BULK_ACTIONS
            }
            Some(n) => n,
            None => DEFAULT_BULK_ACTIONS,
        };

        opts.finish(EsConfig {
            client: ClientSettings {
                urls,
                basic_auth,
                max_retries,
                healthcheck_timeout_startup,
                sniff,
                healthcheck,
            },
            version,
            cluster_name,
            index,
            bulk_actions,
        })
    }
}
