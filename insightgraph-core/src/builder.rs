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

//! Graph Builder
//!
//! Assembles an [`InsightGraph`] for one project from an [`InsightSource`]:
//!
//! ```text
//! sessions → insights (≤ max_nodes) → insight↔insight edges
//!                                   → MENTIONS edges → entities → insight→entity edges
//! ```
//!
//! A project with no sessions yields an empty graph. Any failed fetch is
//! returned to the caller with the stage that failed; nothing is cached or
//! written.

use crate::error::{FetchStage, InsightGraphError, Result};
use crate::graph::{GraphNode, InsightGraph, DEFAULT_EDGE_WEIGHT};
use crate::source::{EdgeRow, InsightRow, InsightSource};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Insight type used when a row carries no tag
pub const DEFAULT_INSIGHT_TYPE: &str = "idea";

/// Label used when an insight has neither summary nor content
pub const PLACEHOLDER_LABEL: &str = "Untitled insight";

/// Entity category used when a row carries none
pub const DEFAULT_ENTITY_TYPE: &str = "unknown";

/// Maximum number of characters of content used as a fallback label
pub const LABEL_MAX_CHARS: usize = 100;

const NODE_KIND_INSIGHT: &str = "insight";
const NODE_KIND_ENTITY: &str = "entity";
const RELATIONSHIP_MENTIONS: &str = "MENTIONS";

/// Options controlling graph construction
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Attach entity nodes reached through `MENTIONS` edges
    pub include_entities: bool,
    /// Maximum number of insight nodes fetched
    pub max_nodes: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_entities: true,
            max_nodes: 500,
        }
    }
}

/// Builds analytics graphs from relational rows
#[derive(Clone)]
pub struct GraphBuilder {
    source: Arc<dyn InsightSource>,
}

impl GraphBuilder {
    pub fn new(source: Arc<dyn InsightSource>) -> Self {
        Self { source }
    }

    /// Build the graph for a project
    #[tracing::instrument(
        skip(self, options),
        fields(include_entities = options.include_entities, max_nodes = options.max_nodes)
    )]
    pub async fn build(&self, project_id: &str, options: &BuildOptions) -> Result<InsightGraph> {
        let mut graph = InsightGraph::new();

        let session_ids = self
            .source
            .list_session_ids_for_project(project_id)
            .await
            .map_err(|e| InsightGraphError::fetch(FetchStage::Sessions, e))?;

        if session_ids.is_empty() {
            debug!("Project {} has no sessions, returning empty graph", project_id);
            return Ok(graph);
        }

        let insights = self
            .source
            .list_insights(&session_ids, options.max_nodes)
            .await
            .map_err(|e| InsightGraphError::fetch(FetchStage::Insights, e))?;

        let mut insight_ids: Vec<String> = Vec::with_capacity(insights.len());
        for row in insights.iter().take(options.max_nodes) {
            if graph.contains_node(&row.id) {
                warn!("Duplicate insight row {} ignored", row.id);
                continue;
            }
            let insight_type = row
                .insight_type
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or(DEFAULT_INSIGHT_TYPE);
            graph.add_node(GraphNode::insight(&row.id, insight_label(row), insight_type))?;
            insight_ids.push(row.id.clone());
        }

        if insight_ids.is_empty() {
            debug!("Project {} has no insights", project_id);
            return Ok(graph);
        }

        let edges = self
            .source
            .list_edges(&insight_ids, NODE_KIND_INSIGHT, NODE_KIND_INSIGHT, None)
            .await
            .map_err(|e| InsightGraphError::fetch(FetchStage::InsightEdges, e))?;

        for row in &edges {
            connect(&mut graph, row, row.similarity.or(row.confidence))?;
        }

        if options.include_entities {
            self.attach_entities(&mut graph, &insight_ids).await?;
        }

        info!(
            "Built graph for project {}: {} nodes, {} edges",
            project_id,
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    async fn attach_entities(&self, graph: &mut InsightGraph, insight_ids: &[String]) -> Result<()> {
        let mentions = self
            .source
            .list_edges(
                insight_ids,
                NODE_KIND_INSIGHT,
                NODE_KIND_ENTITY,
                Some(RELATIONSHIP_MENTIONS),
            )
            .await
            .map_err(|e| InsightGraphError::fetch(FetchStage::MentionEdges, e))?;

        let mut seen: HashSet<&str> = HashSet::new();
        let entity_ids: Vec<String> = mentions
            .iter()
            .filter(|m| seen.insert(m.target_id.as_str()))
            .map(|m| m.target_id.clone())
            .collect();

        if entity_ids.is_empty() {
            return Ok(());
        }

        let entities = self
            .source
            .list_entities(&entity_ids)
            .await
            .map_err(|e| InsightGraphError::fetch(FetchStage::Entities, e))?;

        let mut added: HashSet<String> = HashSet::new();
        for row in entities {
            if graph.contains_node(&row.id) {
                warn!("Entity {} collides with an existing node, skipped", row.id);
                continue;
            }
            let category = row
                .category
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(DEFAULT_ENTITY_TYPE);
            graph.add_node(GraphNode::entity(&row.id, &row.name, category))?;
            added.insert(row.id);
        }

        if added.len() < entity_ids.len() {
            debug!(
                "{} mentioned entities missing from the store",
                entity_ids.len() - added.len()
            );
        }

        for row in mentions.iter().filter(|m| added.contains(&m.target_id)) {
            connect(graph, row, row.confidence)?;
        }

        Ok(())
    }
}

/// Display label: summary, else truncated content, else a placeholder
pub fn insight_label(row: &InsightRow) -> String {
    if let Some(summary) = row.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return summary.to_string();
    }
    if let Some(content) = row.content.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        return content.chars().take(LABEL_MAX_CHARS).collect();
    }
    PLACEHOLDER_LABEL.to_string()
}

/// Add the edge described by `row` if both endpoints are present
fn connect(graph: &mut InsightGraph, row: &EdgeRow, recorded: Option<f64>) -> Result<()> {
    if !graph.contains_node(&row.source_id) || !graph.contains_node(&row.target_id) {
        return Ok(());
    }
    if row.source_id == row.target_id {
        debug!("Skipping self-loop on {}", row.source_id);
        return Ok(());
    }

    let weight = match recorded {
        Some(w) if w.is_finite() && w > 0.0 => w,
        Some(w) => {
            warn!(
                "Edge {} -> {} has unusable weight {}, using default",
                row.source_id, row.target_id, w
            );
            DEFAULT_EDGE_WEIGHT
        }
        None => DEFAULT_EDGE_WEIGHT,
    };

    if !graph.add_edge(&row.source_id, &row.target_id, &row.relationship_type, weight)? {
        debug!(
            "Duplicate edge {} -- {} ignored",
            row.source_id, row.target_id
        );
    }
    Ok(())
}
