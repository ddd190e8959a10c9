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

use anyhow::{Context, Result};
use clap::Parser;
use event_exporter::{load_config_with_env, EventBatch, SinkFactory, SinkManager};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Event Exporter - Export cluster events to Elasticsearch, Kafka or the log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// File with one JSON event batch per line (reads stdin when omitted)
    #[arg(short, long)]
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let config = load_config_with_env(&args.config)?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Event Exporter");
    info!("Loaded configuration from: {:?}", args.config);

    let sinks = SinkFactory::build_all(&config.sinks).await?;
    info!(
        "Sinks initialized: {:?}",
        sinks.iter().map(|s| s.name()).collect::<Vec<_>>()
    );
    let manager = SinkManager::new(sinks, config.export.timeout());

    let exported = match &args.events {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open events file {:?}", path))?;
            run(&manager, BufReader::new(file)).await
        }
        None => run(&manager, BufReader::new(tokio::io::stdin())).await,
    };

    // Cleanup
    manager.stop().await;
    let batches = exported?;
    info!("Event Exporter shut down after {} batches", batches);

    Ok(())
}

/// Export every batch read from `input` until EOF
async fn run<R>(manager: &SinkManager, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut batches = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read events")? {
        if line.trim().is_empty() {
            continue;
        }

        let batch: EventBatch = match serde_json::from_str(&line) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Skipping malformed event batch: {}", e);
                continue;
            }
        };

        for (sink, summary) in manager.export_events(&batch).await {
            match summary {
                Some(summary) if summary.is_clean() => {
                    info!("{}: exported {} events", sink, summary.delivered)
                }
                Some(summary) => warn!(
                    "{}: exported {}/{} events, {} failed, flushed: {}",
                    sink, summary.delivered, summary.total, summary.failed, summary.flushed
                ),
                None => warn!("{}: export timed out", sink),
            }
        }
        batches += 1;
    }

    Ok(batches)
}
