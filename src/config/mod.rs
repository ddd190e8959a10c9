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

// Configuration module for event-exporter
//
// Provides:
// - YAML configuration file loading
// - Environment variable substitution
// - Configuration validation
// - Sink URI parsing

pub mod types;
pub mod uri;
mod loader;

pub use loader::ConfigLoader;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExporterConfig> {
    ConfigLoader::load(path).context("Failed to load configuration")
}

/// Load configuration with environment variable overrides
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<ExporterConfig> {
    let mut config = load_config(path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

/// Sink selections in `EXPORTER_SINKS` are separated by `;` or whitespace.
/// Commas belong to the selections themselves (`?brokers=k1:9092,k2:9092`).
fn split_sink_selections(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn apply_env_overrides(
    config: &mut ExporterConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(sinks) = lookup("EXPORTER_SINKS") {
        config.sinks = split_sink_selections(&sinks);
    }

    if let Some(level) = lookup("EXPORTER_LOG_LEVEL") {
        config.logging.level = level;
    }

    ConfigLoader::validate(config).context("Invalid configuration after environment overrides")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_replace_sinks_and_level() {
        let mut config = ExporterConfig {
            sinks: vec!["log".to_string()],
            ..Default::default()
        };

        apply_env_overrides(&mut config, |name| match name {
            "EXPORTER_SINKS" => Some("log; kafka:?brokers=k1:9092".to_string()),
            "EXPORTER_LOG_LEVEL" => Some("debug".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.sinks, vec!["log", "kafka:?brokers=k1:9092"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_sink_override_is_rejected() {
        let mut config = ExporterConfig {
            sinks: vec!["log".to_string()],
            ..Default::default()
        };

        let result = apply_env_overrides(&mut config, |name| {
            (name == "EXPORTER_SINKS").then(|| " ; ".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_sink_override_keeps_comma_separated_brokers() {
        let mut config = ExporterConfig::default();

        apply_env_overrides(&mut config, |name| {
            (name == "EXPORTER_SINKS").then(|| {
                "kafka:?brokers=k1:9092,k2:9092 elasticsearch:?nodes=http://a:9200,http://b:9200"
                    .to_string()
            })
        })
        .unwrap();

        assert_eq!(
            config.sinks,
            vec![
                "kafka:?brokers=k1:9092,k2:9092",
                "elasticsearch:?nodes=http://a:9200,http://b:9200",
            ]
        );
    }
}
