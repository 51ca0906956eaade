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

//! Cache-through analytics service
//!
//! Request handlers call into [`AnalyticsService`]; it consults the
//! [`AnalyticsCache`] and only builds and analyzes a graph on a miss.
//! Concurrent misses for the same project wait on one computation.

use crate::analytics::{
    compute_graph_analytics, detect_communities, find_shortest_path, AnalyticsResult, Community,
    ShortestPath,
};
use crate::builder::GraphBuilder;
use crate::cache::{AnalyticsCache, CacheStats};
use crate::config::InsightGraphConfig;
use crate::error::Result;
use crate::source::InsightSource;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

pub struct AnalyticsService {
    builder: GraphBuilder,
    cache: Arc<AnalyticsCache>,
    config: InsightGraphConfig,
    /// Per-project computation locks
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl AnalyticsService {
    pub fn new(
        source: Arc<dyn InsightSource>,
        cache: Arc<AnalyticsCache>,
        config: InsightGraphConfig,
    ) -> Self {
        Self {
            builder: GraphBuilder::new(source),
            cache,
            config,
            in_flight: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &Arc<AnalyticsCache> {
        &self.cache
    }

    /// Wait for the project's computation lock
    async fn project_lock(&self, project_id: &str) -> FlightGuard<'_> {
        let lock = self
            .in_flight
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        FlightGuard {
            in_flight: &self.in_flight,
            project_id: project_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Analytics for a project, computed at most once per TTL window
    #[tracing::instrument(skip(self))]
    pub async fn analytics(&self, project_id: &str) -> Result<Arc<AnalyticsResult>> {
        if let Some(hit) = self.cache.get_cached_analytics(project_id) {
            return Ok(hit);
        }

        let _flight = self.project_lock(project_id).await;

        // Another task may have filled the cache while we waited
        if let Some(hit) = self.cache.get_cached_analytics(project_id) {
            debug!("Analytics for {} computed by a concurrent request", project_id);
            return Ok(hit);
        }

        let result = Arc::new(
            compute_graph_analytics(
                &self.builder,
                project_id,
                &self.config.build_options(),
                &self.config.analytics_config(),
            )
            .await?,
        );

        self.cache
            .set_cached_analytics(project_id, Arc::clone(&result), self.config.analytics_ttl());
        self.cache.set_cached_communities(
            project_id,
            result.communities.clone(),
            self.config.communities_ttl(),
        );

        Ok(result)
    }

    /// Communities for a project
    ///
    /// Served from the communities cache, then from cached analytics, and
    /// only then from a fresh graph.
    #[tracing::instrument(skip(self))]
    pub async fn communities(&self, project_id: &str) -> Result<Arc<Vec<Community>>> {
        if let Some(hit) = self.cache.get_cached_communities(project_id) {
            return Ok(hit);
        }

        if let Some(analytics) = self.cache.get_cached_analytics(project_id) {
            let communities = Arc::new(analytics.communities.clone());
            self.cache.set_cached_communities(
                project_id,
                Arc::clone(&communities),
                self.config.communities_ttl(),
            );
            return Ok(communities);
        }

        let _flight = self.project_lock(project_id).await;

        if let Some(hit) = self.cache.get_cached_communities(project_id) {
            return Ok(hit);
        }

        let graph = self
            .builder
            .build(project_id, &self.config.build_options())
            .await?;
        let communities = Arc::new(detect_communities(
            &graph,
            &self.config.analytics_config().louvain,
        ));
        info!(
            "Detected {} communities for project {}",
            communities.len(),
            project_id
        );

        self.cache.set_cached_communities(
            project_id,
            Arc::clone(&communities),
            self.config.communities_ttl(),
        );
        Ok(communities)
    }

    /// Shortest path on a freshly built graph; not cached
    #[tracing::instrument(skip(self))]
    pub async fn shortest_path(
        &self,
        project_id: &str,
        source: &str,
        target: &str,
    ) -> Result<Option<ShortestPath>> {
        let graph = self
            .builder
            .build(project_id, &self.config.build_options())
            .await?;
        Ok(find_shortest_path(&graph, source, target))
    }

    /// Drop cached data after the project's insights, entities or edges change
    pub fn invalidate(&self, project_id: &str) {
        self.cache.invalidate_cache(project_id);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all_caches();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.get_cache_stats()
    }
}

/// Held for the duration of one project computation
///
/// On drop the lock is released, and the map entry is removed if no other
/// request holds or waits on it.
struct FlightGuard<'a> {
    in_flight: &'a DashMap<String, Arc<Mutex<()>>>,
    project_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own handle left
        self.in_flight
            .remove_if(&self.project_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
