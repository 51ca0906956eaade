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

//! Louvain Community Detection
//!
//! Multi-level modularity optimization:
//!
//! 1. **Local moving**: each node joins the neighboring community with the
//!    largest modularity gain, until a full pass moves nothing
//! 2. **Aggregation**: communities collapse into super-nodes whose internal
//!    weight becomes a self-loop
//! 3. **Repeat** on the aggregated graph until no node moves or the gain
//!    drops below `min_improvement`
//!
//! ## Modularity
//!
//! Q = Σc [ in_c / m - γ * (tot_c / 2m)² ]
//!
//! Where:
//! - in_c = total weight of edges inside community c
//! - tot_c = sum of weighted degrees of the nodes in c
//! - m = total edge weight
//! - γ = resolution (higher = more, smaller communities)
//!
//! Without a seed, nodes are visited in insertion order and ties keep the
//! first candidate encountered, so results are reproducible for a fixed graph.

use crate::graph::{InsightGraph, NodeType};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Gains closer than this are treated as ties
const GAIN_EPSILON: f64 = 1e-12;

/// Louvain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LouvainConfig {
    /// Resolution parameter (higher = more communities)
    pub resolution: f64,
    /// Maximum aggregation levels, and maximum passes per local-moving phase
    pub max_iterations: usize,
    /// Minimum modularity improvement to continue aggregating
    pub min_improvement: f64,
    /// Shuffle the visiting order with this seed; `None` keeps insertion order
    pub seed: Option<u64>,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_iterations: 100,
            min_improvement: 1e-6,
            seed: None,
        }
    }
}

/// A cluster of nodes produced by modularity partitioning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    /// Position in the size-ordered output; not stable across computations
    pub id: u32,
    pub node_ids: Vec<String>,
    pub size: usize,
    /// Most frequent member node type, ties broken by first occurrence
    pub dominant_type: NodeType,
    /// Realized internal edges over C(size, 2), rounded to 3 decimals
    pub cohesion: f64,
}

/// Output of a Louvain run
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityDetection {
    pub communities: Vec<Community>,
    pub modularity: f64,
}

/// Partition the graph into communities, largest first
pub fn detect_communities(graph: &InsightGraph, config: &LouvainConfig) -> Vec<Community> {
    louvain(graph, config).communities
}

/// Run Louvain and report the modularity of the final partition
pub fn louvain(graph: &InsightGraph, config: &LouvainConfig) -> CommunityDetection {
    if graph.is_empty() {
        return CommunityDetection {
            communities: Vec::new(),
            modularity: 0.0,
        };
    }

    let partition = louvain_partition(graph, config);
    let level = Level::from_graph(graph);
    let modularity = level.modularity(&partition, config.resolution);

    CommunityDetection {
        communities: build_communities(graph, &partition),
        modularity,
    }
}

/// Modularity of an existing list of communities over `graph`
///
/// Nodes not covered by any community are treated as singletons.
pub fn modularity(graph: &InsightGraph, communities: &[Community], resolution: f64) -> f64 {
    let n = graph.node_count();
    let mut partition: Vec<usize> = (0..n).map(|i| communities.len() + i).collect();
    for (c, community) in communities.iter().enumerate() {
        for id in &community.node_ids {
            if let Some(idx) = graph.index_of(id) {
                partition[idx] = c;
            }
        }
    }
    Level::from_graph(graph).modularity(&partition, resolution)
}

/// Community index per node (contiguous, numbered by first appearance)
fn louvain_partition(graph: &InsightGraph, config: &LouvainConfig) -> Vec<usize> {
    let n = graph.node_count();
    let mut level = Level::from_graph(graph);
    let mut membership: Vec<usize> = (0..n).collect();

    if level.total_weight() <= 0.0 {
        return membership;
    }

    let mut rng = config.seed.map(StdRng::seed_from_u64);
    let mut current_q = level.modularity(&(0..level.len()).collect::<Vec<_>>(), config.resolution);

    for _level in 0..config.max_iterations.max(1) {
        let mut order: Vec<usize> = (0..level.len()).collect();
        if let Some(rng) = rng.as_mut() {
            order.shuffle(rng);
        }

        let (assignment, moved) = level.local_moving(&order, config);
        if !moved {
            break;
        }

        let (assignment, count) = renumber(&assignment);
        let new_q = level.modularity(&assignment, config.resolution);
        let improvement = new_q - current_q;

        for m in membership.iter_mut() {
            *m = assignment[*m];
        }
        level = level.aggregate(&assignment, count);
        current_q = new_q;

        if improvement < config.min_improvement || count == 1 {
            break;
        }
    }

    renumber(&membership).0
}

/// Weighted undirected graph at one aggregation level
struct Level {
    /// Neighbor index and summed weight; excludes self-loops
    neighbors: Vec<Vec<(usize, f64)>>,
    /// Internal weight folded into each super-node
    self_loops: Vec<f64>,
}

impl Level {
    fn from_graph(graph: &InsightGraph) -> Self {
        let n = graph.node_count();
        let neighbors = (0..n)
            .map(|i| {
                graph
                    .adjacent(i)
                    .iter()
                    .map(|a| (a.neighbor, graph.edge_at(a.edge).weight))
                    .collect()
            })
            .collect();
        Self {
            neighbors,
            self_loops: vec![0.0; n],
        }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Weighted degree; a self-loop counts twice
    fn degrees(&self) -> Vec<f64> {
        self.neighbors
            .iter()
            .zip(&self.self_loops)
            .map(|(nb, &s)| nb.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * s)
            .collect()
    }

    fn total_weight(&self) -> f64 {
        self.degrees().iter().sum::<f64>() / 2.0
    }

    fn modularity(&self, assignment: &[usize], resolution: f64) -> f64 {
        let m = self.total_weight();
        if m <= 0.0 {
            return 0.0;
        }

        let degrees = self.degrees();
        let mut internal: HashMap<usize, f64> = HashMap::new();
        let mut totals: HashMap<usize, f64> = HashMap::new();

        for i in 0..self.len() {
            let c = assignment[i];
            *totals.entry(c).or_default() += degrees[i];
            *internal.entry(c).or_default() += self.self_loops[i];
            for &(j, w) in &self.neighbors[i] {
                if assignment[j] == c {
                    // each undirected edge is visited from both ends
                    *internal.entry(c).or_default() += w / 2.0;
                }
            }
        }

        totals
            .iter()
            .map(|(c, &tot)| {
                let inside = internal.get(c).copied().unwrap_or(0.0);
                inside / m - resolution * (tot / (2.0 * m)).powi(2)
            })
            .sum()
    }

    /// Move nodes between communities until a pass makes no move.
    ///
    /// Returns the assignment and whether any node moved.
    fn local_moving(&self, order: &[usize], config: &LouvainConfig) -> (Vec<usize>, bool) {
        let n = self.len();
        let k = self.degrees();
        let two_m = 2.0 * self.total_weight();
        let resolution = config.resolution;

        let mut community: Vec<usize> = (0..n).collect();
        let mut totals: Vec<f64> = k.clone();
        let mut moved_any = false;

        for _pass in 0..config.max_iterations.max(1) {
            let mut moved = false;

            for &node in order {
                let current = community[node];

                // Weight from node to each neighboring community, in encounter order
                let mut links: Vec<(usize, f64)> = Vec::new();
                let mut slots: HashMap<usize, usize> = HashMap::new();
                for &(j, w) in &self.neighbors[node] {
                    let c = community[j];
                    match slots.get(&c) {
                        Some(&s) => links[s].1 += w,
                        None => {
                            slots.insert(c, links.len());
                            links.push((c, w));
                        }
                    }
                }

                totals[current] -= k[node];

                let to_current = slots.get(&current).map(|&s| links[s].1).unwrap_or(0.0);
                let mut best = current;
                let mut best_gain = to_current - resolution * totals[current] * k[node] / two_m;

                for &(c, w) in &links {
                    if c == current {
                        continue;
                    }
                    let gain = w - resolution * totals[c] * k[node] / two_m;
                    if gain > best_gain + GAIN_EPSILON {
                        best = c;
                        best_gain = gain;
                    }
                }

                totals[best] += k[node];
                if best != current {
                    community[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }

            if !moved {
                break;
            }
        }

        (community, moved_any)
    }

    /// Collapse each community into a single node
    fn aggregate(&self, assignment: &[usize], count: usize) -> Level {
        let mut merged: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for i in 0..self.len() {
            let c = assignment[i];
            self_loops[c] += self.self_loops[i];
            for &(j, w) in &self.neighbors[i] {
                let d = assignment[j];
                if c == d {
                    self_loops[c] += w / 2.0;
                } else {
                    *merged[c].entry(d).or_default() += w;
                }
            }
        }

        Level {
            neighbors: merged
                .into_iter()
                .map(|m| m.into_iter().collect())
                .collect(),
            self_loops,
        }
    }
}

/// Renumber community labels to 0..k in order of first appearance
fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let renumbered = assignment
        .iter()
        .map(|&c| {
            let next = mapping.len();
            *mapping.entry(c).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

fn build_communities(graph: &InsightGraph, partition: &[usize]) -> Vec<Community> {
    let count = partition.iter().max().map_or(0, |&m| m + 1);
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (node, &c) in partition.iter().enumerate() {
        members[c].push(node);
    }

    let mut communities: Vec<Community> = members
        .into_iter()
        .enumerate()
        .filter(|(_, nodes)| !nodes.is_empty())
        .map(|(c, nodes)| {
            let internal_edges: usize = nodes
                .iter()
                .map(|&i| {
                    graph
                        .adjacent(i)
                        .iter()
                        .filter(|a| a.neighbor > i && partition[a.neighbor] == c)
                        .count()
                })
                .sum();

            Community {
                id: 0,
                node_ids: nodes.iter().map(|&i| graph.node_at(i).id.clone()).collect(),
                size: nodes.len(),
                dominant_type: dominant_type(graph, &nodes),
                cohesion: cohesion(nodes.len(), internal_edges),
            }
        })
        .collect();

    // stable: equal sizes keep first-appearance order
    communities.sort_by(|a, b| b.size.cmp(&a.size));
    for (id, community) in communities.iter_mut().enumerate() {
        community.id = id as u32;
    }
    communities
}

fn dominant_type(graph: &InsightGraph, nodes: &[usize]) -> NodeType {
    let mut counts: Vec<(NodeType, usize)> = Vec::new();
    for &i in nodes {
        let node_type = graph.node_at(i).node_type;
        match counts.iter_mut().find(|(t, _)| *t == node_type) {
            Some((_, count)) => *count += 1,
            None => counts.push((node_type, 1)),
        }
    }

    let mut best = counts[0];
    for &(t, count) in &counts[1..] {
        if count > best.1 {
            best = (t, count);
        }
    }
    best.0
}

/// Internal edge density, ignoring weights
pub fn cohesion(size: usize, internal_edges: usize) -> f64 {
    if size < 2 {
        return 0.0;
    }
    let max_edges = size * (size - 1) / 2;
    round_to(internal_edges as f64 / max_edges as f64, 3)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use std::collections::HashSet;

    fn graph_of(nodes: &[&str], edges: &[(&str, &str, f64)]) -> InsightGraph {
        let mut graph = InsightGraph::new();
        for id in nodes {
            graph.add_node(GraphNode::insight(*id, *id, "idea")).unwrap();
        }
        for (a, b, w) in edges {
            graph.add_edge(a, b, "SIMILAR_TO", *w).unwrap();
        }
        graph
    }

    fn groups(communities: &[Community]) -> Vec<HashSet<String>> {
        communities
            .iter()
            .map(|c| c.node_ids.iter().cloned().collect())
            .collect()
    }

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_graph() {
        let communities = detect_communities(&InsightGraph::new(), &LouvainConfig::default());
        assert!(communities.is_empty());
    }

    #[test]
    fn test_single_node() {
        let graph = graph_of(&["a"], &[]);
        let communities = detect_communities(&graph, &LouvainConfig::default());
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].size, 1);
        assert_eq!(communities[0].cohesion, 0.0);
    }

    #[test]
    fn test_triangle_is_one_cohesive_community() {
        let graph = graph_of(
            &["a", "b", "c"],
            &[("a", "b", 1.0), ("b", "c", 1.0), ("c", "a", 1.0)],
        );
        let communities = detect_communities(&graph, &LouvainConfig::default());

        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].size, 3);
        assert_eq!(communities[0].cohesion, 1.0);
        assert_eq!(communities[0].dominant_type, NodeType::Insight);
    }

    #[test]
    fn test_disconnected_clusters_sorted_by_size() {
        let graph = graph_of(
            &["p", "q", "a", "b", "c"],
            &[
                ("p", "q", 1.0),
                ("a", "b", 1.0),
                ("b", "c", 1.0),
                ("c", "a", 1.0),
            ],
        );
        let communities = detect_communities(&graph, &LouvainConfig::default());

        assert_eq!(communities.len(), 2);
        assert_eq!(communities[0].size, 3);
        assert_eq!(communities[1].size, 2);
        assert_eq!(groups(&communities), vec![set(&["a", "b", "c"]), set(&["p", "q"])]);
        assert_eq!(communities[1].cohesion, 1.0);
        assert_eq!(communities[0].id, 0);
        assert_eq!(communities[1].id, 1);
    }

    #[test]
    fn test_bridged_cliques_split() {
        let graph = graph_of(
            &["a", "b", "c", "x", "y", "z"],
            &[
                ("a", "b", 1.0),
                ("a", "c", 1.0),
                ("b", "c", 1.0),
                ("x", "y", 1.0),
                ("x", "z", 1.0),
                ("y", "z", 1.0),
                ("c", "x", 0.1),
            ],
        );
        let detection = louvain(&graph, &LouvainConfig::default());

        let found: HashSet<Vec<String>> = detection
            .communities
            .iter()
            .map(|c| {
                let mut ids = c.node_ids.clone();
                ids.sort();
                ids
            })
            .collect();
        assert!(found.contains(&vec!["a".to_string(), "b".into(), "c".into()]));
        assert!(found.contains(&vec!["x".to_string(), "y".into(), "z".into()]));
        assert!(detection.modularity > 0.0);

        let recomputed = modularity(&graph, &detection.communities, 1.0);
        assert!((recomputed - detection.modularity).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let graph = graph_of(
            &["a", "b", "c", "d", "e", "f"],
            &[
                ("a", "b", 1.0),
                ("b", "c", 1.0),
                ("c", "a", 1.0),
                ("d", "e", 1.0),
                ("e", "f", 1.0),
                ("f", "d", 1.0),
                ("c", "d", 0.2),
            ],
        );
        let config = LouvainConfig {
            seed: Some(7),
            ..Default::default()
        };
        let first = detect_communities(&graph, &config);
        let second = detect_communities(&graph, &config);
        assert_eq!(groups(&first), groups(&second));
    }

    #[test]
    fn test_every_node_assigned_once() {
        let graph = graph_of(
            &["a", "b", "c", "d", "lonely"],
            &[("a", "b", 0.5), ("c", "d", 0.5), ("b", "c", 0.05)],
        );
        let communities = detect_communities(&graph, &LouvainConfig::default());
        let mut seen: Vec<String> = communities
            .iter()
            .flat_map(|c| c.node_ids.iter().cloned())
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d", "lonely"]);
        assert!(communities.iter().all(|c| c.size == c.node_ids.len()));
    }

    #[test]
    fn test_dominant_type_prefers_first_on_tie() {
        let mut graph = InsightGraph::new();
        graph.add_node(GraphNode::entity("e", "E", "org")).unwrap();
        graph.add_node(GraphNode::insight("i", "I", "idea")).unwrap();
        graph.add_edge("e", "i", "MENTIONS", 1.0).unwrap();

        let communities = detect_communities(&graph, &LouvainConfig::default());
        assert_eq!(communities.len(), 1);
        assert_eq!(communities[0].dominant_type, NodeType::Entity);
    }

    #[test]
    fn test_cohesion_formula() {
        assert_eq!(cohesion(0, 0), 0.0);
        assert_eq!(cohesion(1, 0), 0.0);
        assert_eq!(cohesion(4, 3), 0.5);
        assert_eq!(cohesion(3, 1), 0.333);
    }
}
