// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Insightgraph CLI
//!
//! Runs graph analytics over a JSON snapshot of the relational store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insightgraph_core::{
    AnalyticsCache, AnalyticsService, GraphBuilder, InsightGraphConfig, Snapshot, SnapshotSource,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "insightgraph")]
#[command(author, version, about = "Insightgraph - insight graph analytics", long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, env = "INSIGHTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Target {
    /// Snapshot file (JSON)
    #[arg(long)]
    snapshot: PathBuf,

    /// Project ID
    #[arg(long)]
    project: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Communities, centrality rankings and graph summary
    Analyze {
        #[command(flatten)]
        target: Target,

        /// Leave entity nodes out of the graph
        #[arg(long)]
        no_entities: bool,

        /// Maximum number of insight nodes
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Length of each centrality ranking
        #[arg(long)]
        top: Option<usize>,
    },

    /// Community partition only
    Communities {
        #[command(flatten)]
        target: Target,
    },

    /// Shortest path between two nodes
    Path {
        #[command(flatten)]
        target: Target,

        /// Source node ID
        #[arg(long)]
        from: String,

        /// Target node ID
        #[arg(long)]
        to: String,
    },

    /// Node and edge counts, density and type distributions
    Stats {
        #[command(flatten)]
        target: Target,
    },
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // Logs go to stderr; stdout carries the JSON result
    let (plain, structured) = if json {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            ),
        )
    } else {
        (
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .init();
}

fn load_source(path: &Path) -> Result<Arc<SnapshotSource>> {
    let snapshot = Snapshot::from_file(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    tracing::debug!(
        "Loaded snapshot: {} sessions, {} insights, {} edges, {} entities",
        snapshot.sessions.len(),
        snapshot.insights.len(),
        snapshot.edges.len(),
        snapshot.entities.len()
    );
    Ok(Arc::new(SnapshotSource::new(snapshot)))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = InsightGraphConfig::load(cli.config)?;

    // Apply CLI overrides
    if let Commands::Analyze {
        no_entities,
        max_nodes,
        top,
        ..
    } = &cli.command
    {
        if *no_entities {
            config.graph.include_entities = false;
        }
        if let Some(max_nodes) = max_nodes {
            config.graph.max_nodes = *max_nodes;
        }
        if let Some(top) = top {
            config.analytics.top_n = *top;
        }
    }
    config.validate()?;

    match cli.command {
        Commands::Analyze { target, .. } => {
            let service = AnalyticsService::new(
                load_source(&target.snapshot)?,
                Arc::new(AnalyticsCache::new()),
                config,
            );
            let result = service.analytics(&target.project).await?;
            print_json(result.as_ref())?;
        }
        Commands::Communities { target } => {
            let service = AnalyticsService::new(
                load_source(&target.snapshot)?,
                Arc::new(AnalyticsCache::new()),
                config,
            );
            let communities = service.communities(&target.project).await?;
            print_json(communities.as_slice())?;
        }
        Commands::Path { target, from, to } => {
            let service = AnalyticsService::new(
                load_source(&target.snapshot)?,
                Arc::new(AnalyticsCache::new()),
                config,
            );
            let path = service.shortest_path(&target.project, &from, &to).await?;
            if path.is_none() {
                tracing::info!("No path between {} and {}", from, to);
            }
            print_json(&path)?;
        }
        Commands::Stats { target } => {
            let builder = GraphBuilder::new(load_source(&target.snapshot)?);
            let graph = builder
                .build(&target.project, &config.build_options())
                .await?;
            print_json(&graph.summary())?;
        }
    }

    Ok(())
}
