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

//! # Insightgraph
//!
//! Graph analytics over research insights, the entities they mention and
//! the relationships between them.
//!
//! ## Features
//!
//! - **Graph builder**: Assembles an undirected weighted graph from four
//!   read-only relational queries ([`InsightSource`])
//! - **Communities**: Multi-level Louvain with cohesion and modularity
//! - **Centrality**: Betweenness, weighted PageRank and degree, with top-N rankings
//! - **Shortest path**: Hop-count BFS between two nodes
//! - **Caching**: TTL cache per project with explicit invalidation
//!
//! ## Example
//!
//! ```rust,ignore
//! use insightgraph_core::{AnalyticsCache, AnalyticsService, InsightGraphConfig, Snapshot, SnapshotSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> insightgraph_core::Result<()> {
//!     let snapshot = Snapshot::from_file("snapshot.json")?;
//!     let service = AnalyticsService::new(
//!         Arc::new(SnapshotSource::new(snapshot)),
//!         Arc::new(AnalyticsCache::new()),
//!         InsightGraphConfig::load(None)?,
//!     );
//!
//!     let analytics = service.analytics("project-1").await?;
//!     println!("{} communities", analytics.communities.len());
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod service;
pub mod source;

pub use analytics::{
    analyze_graph, compute_centrality, compute_graph_analytics, detect_communities,
    find_shortest_path, top_by_centrality, AnalyticsConfig, AnalyticsResult, CentralityMetrics,
    CentralityRanking, Community, LouvainConfig, PageRankConfig, ShortestPath,
};
pub use builder::{BuildOptions, GraphBuilder};
pub use cache::{AnalyticsCache, CacheStats, DEFAULT_TTL};
pub use config::InsightGraphConfig;
pub use error::{FetchStage, InsightGraphError, Result, SourceError};
pub use graph::{GraphEdge, GraphNode, GraphSummary, InsightGraph, NodeType};
pub use service::AnalyticsService;
pub use source::{EdgeRow, EntityRow, InsightRow, InsightSource, SessionRow, Snapshot, SnapshotSource};
