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

//! Hop-count shortest path between two nodes

use crate::graph::InsightGraph;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Label used when an edge on the path cannot be looked up
pub const FALLBACK_EDGE_LABEL: &str = "CONNECTED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortestPath {
    /// Node ids from source to target inclusive
    pub path: Vec<String>,
    /// Number of hops (`path.len() - 1`)
    pub distance: usize,
    pub node_labels: Vec<String>,
    /// Relationship type of each traversed edge
    pub edge_labels: Vec<String>,
}

/// BFS over the graph ignoring edge weights.
///
/// Returns `None` when either endpoint is unknown or the two are not
/// connected.
pub fn find_shortest_path(graph: &InsightGraph, source: &str, target: &str) -> Option<ShortestPath> {
    let start = graph.index_of(source)?;
    let goal = graph.index_of(target)?;

    let mut parent: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut visited = vec![false; graph.node_count()];
    visited[start] = true;

    let mut queue = VecDeque::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        if current == goal {
            break;
        }
        for adj in graph.adjacent(current) {
            if !visited[adj.neighbor] {
                visited[adj.neighbor] = true;
                parent[adj.neighbor] = Some(current);
                queue.push_back(adj.neighbor);
            }
        }
    }

    if !visited[goal] {
        return None;
    }

    let mut indices = vec![goal];
    let mut cursor = goal;
    while let Some(prev) = parent[cursor] {
        indices.push(prev);
        cursor = prev;
    }
    indices.reverse();

    let path: Vec<String> = indices
        .iter()
        .map(|&i| graph.node_at(i).id.clone())
        .collect();
    let node_labels = indices
        .iter()
        .map(|&i| {
            let node = graph.node_at(i);
            if node.label.is_empty() {
                node.id.clone()
            } else {
                node.label.clone()
            }
        })
        .collect();
    let edge_labels = path
        .windows(2)
        .map(|pair| {
            graph
                .edge_between(&pair[0], &pair[1])
                .map(|e| e.relationship_type.clone())
                .unwrap_or_else(|| FALLBACK_EDGE_LABEL.to_string())
        })
        .collect();

    Some(ShortestPath {
        distance: path.len() - 1,
        path,
        node_labels,
        edge_labels,
    })
}
