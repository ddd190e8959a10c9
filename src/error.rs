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

// Error types for sink construction and export
//
// Construction errors (`SinkError`) are fatal and returned to the caller.
// Conversion, delivery and flush errors only ever surface in logs and in
// the `ExportSummary` of a batch.

use std::fmt;
use thiserror::Error;

/// A single problem found while reading a sink configuration URI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("malformed sink URI '{uri}': {reason}")]
    MalformedUri { uri: String, reason: String },

    #[error("no endpoint configured: set '{key}'")]
    MissingEndpoint { key: &'static str },

    #[error("invalid value '{value}' for '{key}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("unsupported Elasticsearch version {0}; supported: 2, 5")]
    UnsupportedVersion(u32),

    #[error("unknown sink '{0}'; supported: elasticsearch, kafka, log")]
    UnknownSink(String),
}

/// Every issue found in one configuration URI, reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    issues: Vec<ConfigIssue>,
}

impl ConfigError {
    pub fn new(issues: Vec<ConfigIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn contains(&self, predicate: impl Fn(&ConfigIssue) -> bool) -> bool {
        self.issues.iter().any(predicate)
    }
}

impl From<ConfigIssue> for ConfigError {
    fn from(issue: ConfigIssue) -> Self {
        Self::new(vec![issue])
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Failure to construct a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("invalid sink configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to connect to {backend}: {reason}")]
    Connection {
        backend: &'static str,
        reason: String,
    },
}

impl SinkError {
    pub fn connection(backend: &'static str, reason: impl fmt::Display) -> Self {
        SinkError::Connection {
            backend,
            reason: reason.to_string(),
        }
    }

    pub fn as_config(&self) -> Option<&ConfigError> {
        match self {
            SinkError::Config(err) => Some(err),
            SinkError::Connection { .. } => None,
        }
    }
}

impl From<ConfigIssue> for SinkError {
    fn from(issue: ConfigIssue) -> Self {
        SinkError::Config(issue.into())
    }
}

/// An event that cannot be turned into a sink point
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("event has no uid")]
    MissingEventId,

    #[error("failed to serialize event {uid}: {source}")]
    Serialize {
        uid: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single record that did not reach the backend
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend rejected record: {0}")]
    Rejected(String),
}

/// Buffered writes that failed to commit at the end of a batch
#[derive(Debug, Error)]
pub enum FlushError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{failed} buffered record(s) rejected, first reason: {reason}")]
    Rejected { failed: usize, reason: String },

    #[error("producer flush failed: {0}")]
    Producer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_all_issues() {
        let err = ConfigError::new(vec![
            ConfigIssue::MissingEndpoint { key: "brokers" },
            ConfigIssue::InvalidValue {
                key: "maxRetries",
                value: "lots".to_string(),
                reason: "invalid digit found in string".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("brokers"));
        assert!(message.contains("maxRetries"));
        assert_eq!(err.issues().len(), 2);
    }

    #[test]
    fn test_sink_error_from_issue_is_config() {
        let err: SinkError = ConfigIssue::UnsupportedVersion(7).into();
        let config = err.as_config().unwrap();
        assert!(config.contains(|i| matches!(i, ConfigIssue::UnsupportedVersion(7))));
    }
}
