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

// Kafka sink options

use crate::config::uri::SinkUri;
use crate::error::{ConfigError, ConfigIssue};
use std::fmt;

pub const DEFAULT_TOPIC: &str = "heapster-events";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Snappy => "snappy",
            Compression::Lz4 => "lz4",
            Compression::Zstd => "zstd",
        }
    }
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            "snappy" => Ok(Compression::Snappy),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd),
            other => Err(format!(
                "unknown codec '{}', expected none, gzip, snappy, lz4 or zstd",
                other
            )),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SaslPlain {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SaslPlain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslPlain")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TlsConfig {
    pub ca_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub compression: Compression,
    pub sasl: Option<SaslPlain>,
    pub tls: Option<TlsConfig>,
}

impl KafkaConfig {
    pub fn from_uri(uri: &SinkUri) -> Result<Self, ConfigError> {
        let mut opts = uri.reader();

        let brokers = opts.list("brokers");
        if brokers.is_empty() {
            opts.issue(ConfigIssue::MissingEndpoint { key: "brokers" });
        }

        let topic = opts.string_or("eventstopic", DEFAULT_TOPIC);
        let compression = opts.parse::<Compression>("compression").unwrap_or_default();

        let sasl = match (opts.string("user"), opts.string("password")) {
            (Some(username), Some(password)) => Some(SaslPlain { username, password }),
            (None, None) => None,
            (Some(_), None) => {
                opts.invalid("user", "<set>", "password must be set as well".to_string());
                None
            }
            (None, Some(_)) => {
                opts.invalid("password", "<redacted>", "user must be set as well".to_string());
                None
            }
        };

        let ca_cert = opts.string("cacert");
        let client_cert = opts.string("cert");
        let client_key = opts.string("key");
        let insecure_skip_verify = opts.flag("insecuressl", false);
        if client_cert.is_some() != client_key.is_some() {
            opts.invalid(
                "cert",
                client_cert.as_deref().unwrap_or(""),
                "cert and key must be set together".to_string(),
            );
        }
        let tls = if ca_cert.is_some() || client_cert.is_some() || insecure_skip_verify {
            Some(TlsConfig {
                ca_cert,
                client_cert,
                client_key,
                insecure_skip_verify,
            })
        } else {
            None
        };

        opts.finish(KafkaConfig {
            brokers,
            topic,
            compression,
            sasl,
            tls,
        })
    }
}
