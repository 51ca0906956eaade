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

//! Error types for graph construction and analytics

use std::fmt;
use thiserror::Error;

/// Errors raised by an [`InsightSource`](crate::source::InsightSource) implementation
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Data source unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Graph-builder stage that issued a failing fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Sessions,
    Insights,
    InsightEdges,
    MentionEdges,
    Entities,
}

impl FetchStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStage::Sessions => "sessions",
            FetchStage::Insights => "insights",
            FetchStage::InsightEdges => "insight_edges",
            FetchStage::MentionEdges => "mention_edges",
            FetchStage::Entities => "entities",
        }
    }
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while building or querying an insight graph
#[derive(Debug, Error)]
pub enum InsightGraphError {
    #[error("Failed to fetch {stage}: {source}")]
    Fetch {
        stage: FetchStage,
        #[source]
        source: SourceError,
    },

    #[error("Node already exists: {0}")]
    DuplicateNode(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Self-loop rejected on node: {0}")]
    SelfLoop(String),

    #[error("Invalid edge weight {weight} between {source_id} and {target_id}")]
    InvalidWeight {
        source_id: String,
        target_id: String,
        weight: f64,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InsightGraphError {
    pub fn fetch(stage: FetchStage, source: SourceError) -> Self {
        InsightGraphError::Fetch { stage, source }
    }
}

pub type Result<T> = std::result::Result<T, InsightGraphError>;
