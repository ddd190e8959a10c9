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

// Sink URI parsing
//
// A sink URI is `[scheme://host[:port]][?key=value&...]`. Keys may repeat.
// `OptionReader` turns the query into typed values and collects every
// problem it finds so a bad URI is reported in one go.

use crate::error::{ConfigError, ConfigIssue};
use std::str::FromStr;
use std::time::Duration;
use reqwest::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkUri {
    raw: String,
    endpoint: Option<String>,
    query: Vec<(String, String)>,
}

impl SinkUri {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();

        // Query-only form, e.g. `?nodes=http://a:9200&nodes=http://b:9200`, gets a
        // placeholder scheme so it parses as a URL without a host.
        let parsed = if raw.is_empty() || raw.starts_with('?') {
            Url::parse(&format!("sink:{}", raw))
        } else {
            Url::parse(raw)
        };
        let url = parsed.map_err(|e| ConfigIssue::MalformedUri {
            uri: raw.to_string(),
            reason: e.to_string(),
        })?;

        let endpoint = url.host_str().map(|host| match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        });
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        Ok(Self {
            raw: raw.to_string(),
            endpoint,
            query,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `scheme://host[:port]` when the URI names a host
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.query
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn reader(&self) -> OptionReader<'_> {
        OptionReader {
            uri: self,
            issues: Vec::new(),
        }
    }
}

impl FromStr for SinkUri {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SinkUri::parse(s)
    }
}

/// Reads typed options from a `SinkUri`, collecting issues instead of
/// stopping at the first one.
pub struct OptionReader<'a> {
    uri: &'a SinkUri,
    issues: Vec<ConfigIssue>,
}

impl<'a> OptionReader<'a> {
    pub fn uri(&self) -> &'a SinkUri {
        self.uri
    }

    pub fn string(&mut self, key: &'static str) -> Option<String> {
        self.uri.first(key).map(str::to_string)
    }

    pub fn string_or(&mut self, key: &'static str, default: &str) -> String {
        self.string(key).unwrap_or_else(|| default.to_string())
    }

    /// All values of a repeatable key; comma-separated values are split.
    pub fn list(&mut self, key: &'static str) -> Vec<String> {
        self.uri
            .values(key)
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn parse<T>(&mut self, key: &'static str) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.uri.first(key)?;
        match raw.parse::<T>() {
            Ok(value) => Some(value),
            Err(e) => {
                self.invalid(key, raw, e.to_string());
                None
            }
        }
    }

    pub fn flag(&mut self, key: &'static str, default: bool) -> bool {
        let Some(raw) = self.uri.first(key) else {
            return default;
        };
        match parse_bool(raw) {
            Some(value) => value,
            None => {
                self.invalid(key, raw, "expected a boolean".to_string());
                default
            }
        }
    }

    /// Whole seconds, e.g. `startupHealthcheckTimeout=30`
    pub fn seconds(&mut self, key: &'static str, default: Duration) -> Duration {
        self.parse::<u64>(key)
            .map(Duration::from_secs)
            .unwrap_or(default)
    }

    pub fn invalid(&mut self, key: &'static str, value: &str, reason: String) {
        self.issues.push(ConfigIssue::InvalidValue {
            key,
            value: value.to_string(),
            reason,
        });
    }

    pub fn issue(&mut self, issue: ConfigIssue) {
        self.issues.push(issue);
    }

    pub fn finish<T>(self, value: T) -> Result<T, ConfigError> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(ConfigError::new(self.issues))
        }
    }
}

/// Accepts `1`/`0`, `t`/`f` and `true`/`false` in lower, upper or title case.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
