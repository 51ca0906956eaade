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

//! Relational read interface consumed by the graph builder
//!
//! The builder only needs four read-only queries. Any backing store can
//! implement [`InsightSource`]; [`SnapshotSource`] serves a JSON snapshot
//! held in memory.

use crate::error::{Result, SourceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Session record linking insights to a project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub id: String,
    pub project_id: String,
}

/// Insight record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsightRow {
    pub id: String,
    pub session_id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub insight_type: Option<String>,
}

/// Precomputed relationship edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRow {
    pub source_id: String,
    pub target_id: String,
    pub source_type: String,
    pub target_type: String,
    pub relationship_type: String,
    #[serde(default)]
    pub similarity: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Knowledge entity record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Read-only queries the graph builder issues
#[async_trait]
pub trait InsightSource: Send + Sync {
    /// Session ids belonging to a project
    async fn list_session_ids_for_project(
        &self,
        project_id: &str,
    ) -> std::result::Result<Vec<String>, SourceError>;

    /// At most `limit` insights belonging to any of the sessions
    async fn list_insights(
        &self,
        session_ids: &[String],
        limit: usize,
    ) -> std::result::Result<Vec<InsightRow>, SourceError>;

    /// Edges whose source is one of `node_ids` and whose recorded endpoint
    /// types match, optionally filtered by relationship type
    async fn list_edges(
        &self,
        node_ids: &[String],
        source_type: &str,
        target_type: &str,
        relationship_type: Option<&str>,
    ) -> std::result::Result<Vec<EdgeRow>, SourceError>;

    /// Entity records for the given ids; unknown ids are omitted
    async fn list_entities(&self, ids: &[String])
        -> std::result::Result<Vec<EntityRow>, SourceError>;
}

/// Point-in-time copy of the relational data for one or more projects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub sessions: Vec<SessionRow>,
    #[serde(default)]
    pub insights: Vec<InsightRow>,
    #[serde(default)]
    pub edges: Vec<EdgeRow>,
    #[serde(default)]
    pub entities: Vec<EntityRow>,
}

impl Snapshot {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// [`InsightSource`] backed by an in-memory [`Snapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl InsightSource for SnapshotSource {
    async fn list_session_ids_for_project(
        &self,
        project_id: &str,
    ) -> std::result::Result<Vec<String>, SourceError> {
        Ok(self
            .snapshot
            .sessions
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.id.clone())
            .collect())
    }

    async fn list_insights(
        &self,
        session_ids: &[String],
        limit: usize,
    ) -> std::result::Result<Vec<InsightRow>, SourceError> {
        let sessions: HashSet<&str> = session_ids.iter().map(String::as_str).collect();
        Ok(self
            .snapshot
            .insights
            .iter()
            .filter(|i| sessions.contains(i.session_id.as_str()))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_edges(
        &self,
        node_ids: &[String],
        source_type: &str,
        target_type: &str,
        relationship_type: Option<&str>,
    ) -> std::result::Result<Vec<EdgeRow>, SourceError> {
        let ids: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        Ok(self
            .snapshot
            .edges
            .iter()
            .filter(|e| ids.contains(e.source_id.as_str()))
            .filter(|e| e.source_type == source_type && e.target_type == target_type)
            .filter(|e| relationship_type.map_or(true, |r| e.relationship_type == r))
            .cloned()
            .collect())
    }

    async fn list_entities(
        &self,
        ids: &[String],
    ) -> std::result::Result<Vec<EntityRow>, SourceError> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .snapshot
            .entities
            .iter()
            .filter(|e| wanted.contains(e.id.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"{
        "sessions": [
            {"id": "s1", "projectId": "p1"},
            {"id": "s2", "projectId": "p2"}
        ],
        "insights": [
            {"id": "i1", "sessionId": "s1", "summary": "Checkout is slow"},
            {"id": "i2", "sessionId": "s1", "content": "Users abandon carts", "insightType": "pain_point"},
            {"id": "i3", "sessionId": "s2"}
        ],
        "edges": [
            {"sourceId": "i1", "targetId": "i2", "sourceType": "insight", "targetType": "insight",
             "relationshipType": "SIMILAR_TO", "similarity": 0.8},
            {"sourceId": "i1", "targetId": "e1", "sourceType": "insight", "targetType": "entity",
             "relationshipType": "MENTIONS"}
        ],
        "entities": [{"id": "e1", "name": "Checkout", "category": "feature"}]
    }"#;

    #[tokio::test]
    async fn test_snapshot_queries() {
        let source = SnapshotSource::new(Snapshot::from_json_str(SNAPSHOT).unwrap());

        let sessions = source.list_session_ids_for_project("p1").await.unwrap();
        assert_eq!(sessions, vec!["s1".to_string()]);

        let insights = source.list_insights(&sessions, 10).await.unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[1].insight_type.as_deref(), Some("pain_point"));

        let limited = source.list_insights(&sessions, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let ids = vec!["i1".to_string(), "i2".to_string()];
        let insight_edges = source
            .list_edges(&ids, "insight", "insight", None)
            .await
            .unwrap();
        assert_eq!(insight_edges.len(), 1);

        let mentions = source
            .list_edges(&ids, "insight", "entity", Some("MENTIONS"))
            .await
            .unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].confidence, None);

        let entities = source
            .list_entities(&["e1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].category.as_deref(), Some("feature"));
    }

    #[tokio::test]
    async fn test_unknown_project_has_no_sessions() {
        let source = SnapshotSource::new(Snapshot::from_json_str(SNAPSHOT).unwrap());
        assert!(source
            .list_session_ids_for_project("nope")
            .await
            .unwrap()
            .is_empty());
    }
}
