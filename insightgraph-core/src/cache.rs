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

//! Analytics Result Caching Layer
//!
//! TTL memoization keyed by project id, in front of the analytics engine.
//! Two independent kinds are kept:
//!
//! - full [`AnalyticsResult`]s
//! - community lists
//!
//! ## Expiry
//!
//! Each entry carries its own TTL, applied through a moka [`Expiry`]
//! policy. Expired entries are never returned by a read and drop out of
//! [`AnalyticsCache::get_cache_stats`].
//!
//! ## Invalidation
//!
//! Callers mutating a project's insights, entities or edges call
//! [`AnalyticsCache::invalidate_cache`], which drops both kinds for that
//! project.

use crate::analytics::{AnalyticsResult, Community};
use moka::sync::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// TTL applied when callers have no preference
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// Cached value paired with the TTL it was stored with
type Entry<T> = (Arc<T>, Duration);

/// Expires each entry after its own TTL, restarted on overwrite
struct PerEntryTtl;

impl<T> Expiry<String, Entry<T>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry<T>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry<T>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

fn ttl_cache<T: Send + Sync + 'static>() -> Cache<String, Entry<T>> {
    Cache::builder().expire_after(PerEntryTtl).build()
}

/// Collect unexpired keys into `out`, returning how many there were
fn live_keys<T>(cache: &Cache<String, Entry<T>>, out: &mut BTreeSet<String>) -> usize
where
    T: Send + Sync + 'static,
{
    cache.run_pending_tasks();
    let mut count = 0;
    for (key, _) in cache.iter() {
        out.insert(key.as_ref().clone());
        count += 1;
    }
    count
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Unexpired entries in the analytics kind
    pub analytics_entries: usize,
    pub community_entries: usize,
    /// Sorted, distinct across both kinds
    pub project_ids: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    /// Cache hit rate (0.0 - 1.0)
    pub hit_rate: f64,
}

/// Process-lifetime analytics cache, shared behind an `Arc`
pub struct AnalyticsCache {
    analytics: Cache<String, Entry<AnalyticsResult>>,
    communities: Cache<String, Entry<Vec<Community>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for AnalyticsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyticsCache {
    pub fn new() -> Self {
        Self {
            analytics: ttl_cache(),
            communities: ttl_cache(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn record<T>(&self, kind: &str, project_id: &str, found: Option<Entry<T>>) -> Option<Arc<T>> {
        match found {
            Some((data, _)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit ({}) for project {}", kind, project_id);
                Some(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss ({}) for project {}", kind, project_id);
                None
            }
        }
    }

    /// Cached analytics for a project, `None` on miss or expiry
    pub fn get_cached_analytics(&self, project_id: &str) -> Option<Arc<AnalyticsResult>> {
        self.record("analytics", project_id, self.analytics.get(project_id))
    }

    /// Store analytics, replacing any existing entry for the project
    pub fn set_cached_analytics(
        &self,
        project_id: &str,
        data: impl Into<Arc<AnalyticsResult>>,
        ttl: Duration,
    ) {
        self.analytics
            .insert(project_id.to_string(), (data.into(), ttl));
    }

    /// Cached communities for a project, `None` on miss or expiry
    pub fn get_cached_communities(&self, project_id: &str) -> Option<Arc<Vec<Community>>> {
        self.record("communities", project_id, self.communities.get(project_id))
    }

    pub fn set_cached_communities(
        &self,
        project_id: &str,
        data: impl Into<Arc<Vec<Community>>>,
        ttl: Duration,
    ) {
        self.communities
            .insert(project_id.to_string(), (data.into(), ttl));
    }

    /// Drop both kinds for one project
    pub fn invalidate_cache(&self, project_id: &str) {
        self.analytics.invalidate(project_id);
        self.communities.invalidate(project_id);
        debug!("Invalidated cache for project {}", project_id);
    }

    /// Drop everything
    pub fn invalidate_all_caches(&self) {
        self.analytics.invalidate_all();
        self.communities.invalidate_all();
        debug!("Invalidated all analytics caches");
    }

    /// Snapshot of the live entries and counters
    pub fn get_cache_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let mut project_ids = BTreeSet::new();
        let analytics_entries = live_keys(&self.analytics, &mut project_ids);
        let community_entries = live_keys(&self.communities, &mut project_ids);

        CacheStats {
            analytics_entries,
            community_entries,
            project_ids: project_ids.into_iter().collect(),
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}
