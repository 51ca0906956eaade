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

//! Centrality metrics: Betweenness (Brandes), weighted PageRank, Degree.
//!
//! - Betweenness: fraction of shortest paths between other node pairs that
//!   pass through a node, normalized by `(n-1)(n-2)/2`
//! - PageRank: power iteration over edge weights; scores sum to 1
//! - Degree: `degree / (n-1)`

use crate::analytics::community::round_to;
use crate::graph::{InsightGraph, NodeType};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

/// PageRank configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRankConfig {
    pub damping_factor: f64,
    pub max_iterations: usize,
    /// Stop once the L1 change between iterations falls below this
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

/// Per-node scores for each metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralityMetrics {
    pub betweenness: HashMap<String, f64>,
    pub page_rank: HashMap<String, f64>,
    pub degree: HashMap<String, f64>,
}

/// One entry of a top-N ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CentralityRanking {
    pub id: String,
    /// Rounded to 4 decimals
    pub score: f64,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,
}

/// Compute all three metrics. An empty graph yields empty maps.
pub fn compute_centrality(graph: &InsightGraph, config: &PageRankConfig) -> CentralityMetrics {
    if graph.is_empty() {
        return CentralityMetrics::default();
    }

    CentralityMetrics {
        betweenness: keyed(graph, betweenness(graph)),
        page_rank: keyed(graph, page_rank(graph, config)),
        degree: keyed(graph, degree(graph)),
    }
}

fn keyed(graph: &InsightGraph, scores: Vec<f64>) -> HashMap<String, f64> {
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| (graph.node_at(i).id.clone(), s))
        .collect()
}

/// Normalized betweenness via Brandes' algorithm (unweighted, undirected)
pub(crate) fn betweenness(graph: &InsightGraph) -> Vec<f64> {
    let n = graph.node_count();
    let mut bc = vec![0.0_f64; n];

    for s in 0..n {
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        let mut delta = vec![0.0_f64; n];

        sigma[s] = 1.0;
        dist[s] = 0;

        let mut queue = VecDeque::new();
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for adj in graph.adjacent(v) {
                let w = adj.neighbor;
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        // Back-propagation of dependencies
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
            }
            if w != s {
                bc[w] += delta[w];
            }
        }
    }

    // Every pair was counted from both ends; normalize by C(n-1, 2)
    if n > 2 {
        let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
        for b in bc.iter_mut() {
            *b *= scale;
        }
    } else {
        bc.iter_mut().for_each(|b| *b = 0.0);
    }

    bc
}

/// Weighted PageRank via power iteration.
///
/// Rank held by nodes without edges is spread uniformly, so the scores
/// always sum to 1.
pub(crate) fn page_rank(graph: &InsightGraph, config: &PageRankConfig) -> Vec<f64> {
    let n = graph.node_count();
    if n == 0 {
        return Vec::new();
    }

    let d = config.damping_factor;
    let strength: Vec<f64> = (0..n)
        .map(|i| {
            graph
                .adjacent(i)
                .iter()
                .map(|a| graph.edge_at(a.edge).weight)
                .sum()
        })
        .collect();

    let mut rank = vec![1.0 / n as f64; n];

    for _ in 0..config.max_iterations {
        let dangling: f64 = (0..n).filter(|&i| strength[i] <= 0.0).map(|i| rank[i]).sum();
        let base = (1.0 - d) / n as f64 + d * dangling / n as f64;
        let mut next = vec![base; n];

        for i in 0..n {
            if strength[i] <= 0.0 {
                continue;
            }
            let share = d * rank[i] / strength[i];
            for adj in graph.adjacent(i) {
                next[adj.neighbor] += share * graph.edge_at(adj.edge).weight;
            }
        }

        let delta: f64 = next.iter().zip(&rank).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < config.tolerance {
            break;
        }
    }

    rank
}

/// Degree centrality: degree over `n - 1` (0 for a single node)
pub(crate) fn degree(graph: &InsightGraph) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![0.0; n];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| graph.adjacent(i).len() as f64 / denom)
        .collect()
}

/// Highest-scoring nodes, with label and type attached when still present
pub fn top_by_centrality(
    graph: &InsightGraph,
    scores: &HashMap<String, f64>,
    top_n: usize,
) -> Vec<CentralityRanking> {
    let mut ranked: Vec<(&String, f64)> = scores.iter().map(|(id, &s)| (id, s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(top_n)
        .map(|(id, score)| {
            let node = graph.node(id);
            CentralityRanking {
                id: id.clone(),
                score: round_to(score, 4),
                label: node.map(|n| n.label.clone()),
                node_type: node.map(|n| n.node_type),
            }
        })
        .collect()
}
