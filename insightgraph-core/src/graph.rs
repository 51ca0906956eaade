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

//! Insight Graph
//!
//! Undirected, weighted, simple graph over insights and the entities they
//! mention. Nodes keep their insertion order, which the analytics use as
//! the deterministic visiting order.
//!
//! - Duplicate node ids are rejected, existing attributes are never overwritten
//! - A second edge between the same unordered pair is a no-op
//! - Self-loops are rejected

use crate::error::{InsightGraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Weight used when the source row records no similarity or confidence
pub const DEFAULT_EDGE_WEIGHT: f64 = 0.5;

/// Attribute key holding an insight's categorical tag
pub const ATTR_INSIGHT_TYPE: &str = "insightType";

/// Attribute key holding an entity's category
pub const ATTR_ENTITY_TYPE: &str = "entityType";

/// Node types in the analytics graph
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Insight,
    Entity,
    Challenge,
    Synthesis,
    InsightType,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Insight => "insight",
            NodeType::Entity => "entity",
            NodeType::Challenge => "challenge",
            NodeType::Synthesis => "synthesis",
            NodeType::InsightType => "insight_type",
        }
    }
}

/// A vertex: an insight, an entity, or one of the auxiliary kinds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    /// Type-specific attributes (`insightType`, `entityType`, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, node_type: NodeType, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type,
            label: label.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Insight node tagged with its insight type
    pub fn insight(
        id: impl Into<String>,
        label: impl Into<String>,
        insight_type: impl Into<String>,
    ) -> Self {
        Self::new(id, NodeType::Insight, label).with_attribute(ATTR_INSIGHT_TYPE, insight_type)
    }

    /// Entity node tagged with its category
    pub fn entity(
        id: impl Into<String>,
        name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self::new(id, NodeType::Entity, name).with_attribute(ATTR_ENTITY_TYPE, entity_type)
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Undirected weighted edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Relationship label, e.g. `SIMILAR_TO`, `MENTIONS`
    pub relationship_type: String,
    pub weight: f64,
}

/// Adjacency entry: neighbor index plus the index of the connecting edge
#[derive(Debug, Clone, Copy)]
pub(crate) struct Adjacent {
    pub(crate) neighbor: usize,
    pub(crate) edge: usize,
}

/// Aggregate statistics about a graph
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub avg_degree: f64,
    pub density: f64,
    pub node_type_distribution: BTreeMap<String, usize>,
    pub relationship_type_distribution: BTreeMap<String, usize>,
}

/// In-memory analytics graph
#[derive(Debug, Clone, Default)]
pub struct InsightGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<String, usize>,
    adjacency: Vec<Vec<Adjacent>>,
    edges: Vec<GraphEdge>,
    /// Unordered pair (low, high) -> edge index
    pair_index: HashMap<(usize, usize), usize>,
}

impl InsightGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Fails if the id is already present.
    pub fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if self.index.contains_key(&node.id) {
            return Err(InsightGraphError::DuplicateNode(node.id));
        }
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        Ok(())
    }

    /// Add an undirected edge.
    ///
    /// Returns `Ok(false)` when the pair is already connected; the existing
    /// edge keeps its label and weight.
    pub fn add_edge(
        &mut self,
        source: &str,
        target: &str,
        relationship_type: impl Into<String>,
        weight: f64,
    ) -> Result<bool> {
        let s = self.require(source)?;
        let t = self.require(target)?;
        if s == t {
            return Err(InsightGraphError::SelfLoop(source.to_string()));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(InsightGraphError::InvalidWeight {
                source_id: source.to_string(),
                target_id: target.to_string(),
                weight,
            });
        }

        let key = pair_key(s, t);
        if self.pair_index.contains_key(&key) {
            return Ok(false);
        }

        let edge_idx = self.edges.len();
        self.edges.push(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            relationship_type: relationship_type.into(),
            weight,
        });
        self.pair_index.insert(key, edge_idx);
        self.adjacency[s].push(Adjacent {
            neighbor: t,
            edge: edge_idx,
        });
        self.adjacency[t].push(Adjacent {
            neighbor: s,
            edge: edge_idx,
        });
        Ok(true)
    }

    fn require(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| InsightGraphError::UnknownNode(id.to_string()))
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Edge between two nodes, regardless of argument order
    pub fn edge_between(&self, a: &str, b: &str) -> Option<&GraphEdge> {
        let (Some(&ia), Some(&ib)) = (self.index.get(a), self.index.get(b)) else {
            return None;
        };
        self.pair_index
            .get(&pair_key(ia, ib))
            .map(|&e| &self.edges[e])
    }

    /// Neighbor ids of a node, in edge insertion order
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        match self.index.get(id) {
            Some(&i) => self.adjacency[i]
                .iter()
                .map(|a| self.nodes[a.neighbor].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn degree(&self, id: &str) -> usize {
        self.index
            .get(id)
            .map(|&i| self.adjacency[i].len())
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub(crate) fn node_at(&self, idx: usize) -> &GraphNode {
        &self.nodes[idx]
    }

    pub(crate) fn edge_at(&self, idx: usize) -> &GraphEdge {
        &self.edges[idx]
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn adjacent(&self, idx: usize) -> &[Adjacent] {
        &self.adjacency[idx]
    }

    /// Compute graph statistics
    pub fn summary(&self) -> GraphSummary {
        let node_count = self.nodes.len();
        let edge_count = self.edges.len();

        let avg_degree = if node_count > 0 {
            2.0 * edge_count as f64 / node_count as f64
        } else {
            0.0
        };

        let density = if node_count > 1 {
            2.0 * edge_count as f64 / (node_count * (node_count - 1)) as f64
        } else {
            0.0
        };

        let mut node_type_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for node in &self.nodes {
            *node_type_distribution
                .entry(node.node_type.as_str().to_string())
                .or_default() += 1;
        }

        let mut relationship_type_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &self.edges {
            *relationship_type_distribution
                .entry(edge.relationship_type.clone())
                .or_default() += 1;
        }

        GraphSummary {
            node_count,
            edge_count,
            avg_degree,
            density,
            node_type_distribution,
            relationship_type_distribution,
        }
    }
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> InsightGraph {
        let mut graph = InsightGraph::new();
        for id in ["a", "b", "c"] {
            graph.add_node(GraphNode::insight(id, id, "idea")).unwrap();
        }
        graph.add_edge("a", "b", "SIMILAR_TO", 0.9).unwrap();
        graph.add_edge("b", "c", "SIMILAR_TO", 0.8).unwrap();
        graph.add_edge("c", "a", "SIMILAR_TO", 0.7).unwrap();
        graph
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = InsightGraph::new();
        graph
            .add_node(GraphNode::insight("a", "first", "idea"))
            .unwrap();
        let err = graph
            .add_node(GraphNode::insight("a", "second", "question"))
            .unwrap_err();
        assert!(matches!(err, InsightGraphError::DuplicateNode(id) if id == "a"));
        // original attributes survive
        let node = graph.node("a").unwrap();
        assert_eq!(node.label, "first");
        assert_eq!(node.attribute(ATTR_INSIGHT_TYPE), Some("idea"));
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let mut graph = triangle();
        assert_eq!(graph.edge_count(), 3);

        let inserted = graph.add_edge("b", "a", "MENTIONS", 0.1).unwrap();
        assert!(!inserted);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.degree("a"), 2);

        let edge = graph.edge_between("a", "b").unwrap();
        assert_eq!(edge.relationship_type, "SIMILAR_TO");
        assert_eq!(edge.weight, 0.9);
    }

    #[test]
    fn test_lookups_follow_insertion_order() {
        let mut graph = triangle();
        graph.add_node(GraphNode::insight("d", "d", "idea")).unwrap();
        graph.add_edge("d", "a", "MENTIONS", 0.5).unwrap();

        assert_eq!(graph.neighbors("a"), vec!["b", "c", "d"]);
        assert_eq!(graph.neighbors("b"), vec!["a", "c"]);
        assert_eq!(graph.neighbors("d"), vec!["a"]);
        assert!(graph.neighbors("missing").is_empty());

        let ids: Vec<&str> = graph.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);

        let edges: Vec<(&str, &str, &str)> = graph
            .edges()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.relationship_type.as_str()))
            .collect();
        assert_eq!(
            edges,
            vec![
                ("a", "b", "SIMILAR_TO"),
                ("b", "c", "SIMILAR_TO"),
                ("c", "a", "SIMILAR_TO"),
                ("d", "a", "MENTIONS"),
            ]
        );
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = triangle();
        assert!(matches!(
            graph.add_edge("a", "a", "SIMILAR_TO", 1.0),
            Err(InsightGraphError::SelfLoop(_))
        ));
    }

    #[test]
    fn test_edge_to_unknown_node_rejected() {
        let mut graph = triangle();
        assert!(matches!(
            graph.add_edge("a", "zzz", "SIMILAR_TO", 1.0),
            Err(InsightGraphError::UnknownNode(id)) if id == "zzz"
        ));
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let mut graph = InsightGraph::new();
        graph.add_node(GraphNode::insight("a", "a", "idea")).unwrap();
        graph.add_node(GraphNode::insight("b", "b", "idea")).unwrap();
        assert!(graph.add_edge("a", "b", "SIMILAR_TO", 0.0).is_err());
        assert!(graph.add_edge("a", "b", "SIMILAR_TO", f64::NAN).is_err());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_edge_between_is_order_independent() {
        let graph = triangle();
        assert!(graph.edge_between("c", "b").is_some());
        assert!(graph.edge_between("b", "c").is_some());
        assert!(graph.edge_between("a", "missing").is_none());
    }

    #[test]
    fn test_summary() {
        let mut graph = triangle();
        graph
            .add_node(GraphNode::entity("e1", "Payments", "organization"))
            .unwrap();
        graph.add_edge("a", "e1", "MENTIONS", 0.5).unwrap();

        let summary = graph.summary();
        assert_eq!(summary.node_count, 4);
        assert_eq!(summary.edge_count, 4);
        assert_eq!(summary.node_type_distribution["insight"], 3);
        assert_eq!(summary.node_type_distribution["entity"], 1);
        assert_eq!(summary.relationship_type_distribution["SIMILAR_TO"], 3);
        assert_eq!(summary.relationship_type_distribution["MENTIONS"], 1);
        assert!((summary.avg_degree - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_graph_summary() {
        let summary = InsightGraph::new().summary();
        assert_eq!(summary.node_count, 0);
        assert_eq!(summary.density, 0.0);
    }
}
