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

//! Graph analytics over an [`InsightGraph`]
//!
//! - Community detection (Louvain)
//! - Centrality (betweenness, PageRank, degree) and top-N rankings
//! - Hop-count shortest path

mod centrality;
mod community;
mod path;

pub use centrality::{
    compute_centrality, top_by_centrality, CentralityMetrics, CentralityRanking, PageRankConfig,
};
pub use community::{
    cohesion, detect_communities, louvain, modularity, Community, CommunityDetection,
    LouvainConfig,
};
pub use path::{find_shortest_path, ShortestPath, FALLBACK_EDGE_LABEL};

pub(crate) use community::round_to;

use crate::builder::{BuildOptions, GraphBuilder};
use crate::error::Result;
use crate::graph::{GraphSummary, InsightGraph};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default length of each centrality ranking
pub const DEFAULT_TOP_N: usize = 10;

/// Parameters for one analytics pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub louvain: LouvainConfig,
    pub page_rank: PageRankConfig,
    pub top_n: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            louvain: LouvainConfig::default(),
            page_rank: PageRankConfig::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Aggregate analytics for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub project_id: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub communities: Vec<Community>,
    pub modularity: f64,
    pub top_betweenness: Vec<CentralityRanking>,
    pub top_page_rank: Vec<CentralityRanking>,
    pub top_degree: Vec<CentralityRanking>,
    pub summary: GraphSummary,
    pub computed_at: DateTime<Utc>,
}

/// Run every analytic over an already built graph
pub fn analyze_graph(
    project_id: &str,
    graph: &InsightGraph,
    config: &AnalyticsConfig,
) -> AnalyticsResult {
    let detection = louvain(graph, &config.louvain);
    let metrics = compute_centrality(graph, &config.page_rank);

    AnalyticsResult {
        project_id: project_id.to_string(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        modularity: round_to(detection.modularity, 4),
        communities: detection.communities,
        top_betweenness: top_by_centrality(graph, &metrics.betweenness, config.top_n),
        top_page_rank: top_by_centrality(graph, &metrics.page_rank, config.top_n),
        top_degree: top_by_centrality(graph, &metrics.degree, config.top_n),
        summary: graph.summary(),
        computed_at: Utc::now(),
    }
}

/// Build the project graph and analyze it. Never reads or writes a cache.
#[tracing::instrument(skip(builder, options, config))]
pub async fn compute_graph_analytics(
    builder: &GraphBuilder,
    project_id: &str,
    options: &BuildOptions,
    config: &AnalyticsConfig,
) -> Result<AnalyticsResult> {
    let graph = builder.build(project_id, options).await?;
    let result = analyze_graph(project_id, &graph, config);

    info!(
        "Analytics for {}: {} nodes, {} edges, {} communities (modularity {:.4})",
        project_id,
        result.node_count,
        result.edge_count,
        result.communities.len(),
        result.modularity
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Snapshot, SnapshotSource};
    use std::sync::Arc;

    const SNAPSHOT: &str = r#"{
        "sessions": [{"id": "s1", "projectId": "p1"}],
        "insights": [
            {"id": "hub", "sessionId": "s1", "summary": "Onboarding friction"},
            {"id": "l1", "sessionId": "s1", "summary": "Too many fields"},
            {"id": "l2", "sessionId": "s1", "summary": "Unclear pricing"},
            {"id": "l3", "sessionId": "s1", "summary": "Slow email verification"}
        ],
        "edges": [
            {"sourceId": "hub", "targetId": "l1", "sourceType": "insight", "targetType": "insight",
             "relationshipType": "SIMILAR_TO", "similarity": 0.9},
            {"sourceId": "hub", "targetId": "l2", "sourceType": "insight", "targetType": "insight",
             "relationshipType": "SIMILAR_TO", "similarity": 0.7},
            {"sourceId": "hub", "targetId": "l3", "sourceType": "insight", "targetType": "insight",
             "relationshipType": "SIMILAR_TO", "similarity": 0.6}
        ]
    }"#;

    fn builder() -> GraphBuilder {
        let snapshot = Snapshot::from_json_str(SNAPSHOT).unwrap();
        GraphBuilder::new(Arc::new(SnapshotSource::new(snapshot)))
    }

    #[test]
    fn test_analyze_empty_graph() {
        let result = analyze_graph("p", &InsightGraph::new(), &AnalyticsConfig::default());
        assert_eq!(result.node_count, 0);
        assert!(result.communities.is_empty());
        assert!(result.top_betweenness.is_empty());
        assert!(result.top_page_rank.is_empty());
        assert!(result.top_degree.is_empty());
        assert_eq!(result.modularity, 0.0);
    }

    #[tokio::test]
    async fn test_compute_graph_analytics_star() {
        let result = compute_graph_analytics(
            &builder(),
            "p1",
            &BuildOptions::default(),
            &AnalyticsConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(result.project_id, "p1");
        assert_eq!(result.node_count, 4);
        assert_eq!(result.edge_count, 3);
        assert_eq!(result.top_betweenness[0].id, "hub");
        assert_eq!(result.top_degree[0].id, "hub");
        assert_eq!(result.top_page_rank[0].id, "hub");
        assert_eq!(
            result.communities.iter().map(|c| c.size).sum::<usize>(),
            4
        );
    }

    #[tokio::test]
    async fn test_top_n_limits_rankings() {
        let config = AnalyticsConfig {
            top_n: 2,
            ..AnalyticsConfig::default()
        };
        let result = compute_graph_analytics(&builder(), "p1", &BuildOptions::default(), &config)
            .await
            .unwrap();
        assert_eq!(result.top_betweenness.len(), 2);
        assert_eq!(result.top_page_rank.len(), 2);
        assert_eq!(result.top_degree.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_project_yields_empty_result() {
        let result = compute_graph_analytics(
            &builder(),
            "nope",
            &BuildOptions::default(),
            &AnalyticsConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(result.node_count, 0);
        assert!(result.communities.is_empty());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = analyze_graph("p", &InsightGraph::new(), &AnalyticsConfig::default());
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("projectId").is_some());
        assert!(json.get("topPageRank").is_some());
        assert!(json.get("computedAt").is_some());
    }
}
