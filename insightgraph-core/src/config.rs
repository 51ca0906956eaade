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

use crate::analytics::{AnalyticsConfig, LouvainConfig, PageRankConfig};
use crate::builder::BuildOptions;
use crate::error::{InsightGraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Insightgraph Configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct InsightGraphConfig {
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub analytics: AnalyticsSection,
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphSection {
    /// Add entity nodes and MENTIONS edges
    #[serde(default = "default_include_entities")]
    pub include_entities: bool,

    /// Maximum number of insight nodes per graph
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalyticsSection {
    /// Louvain resolution (higher = more, smaller communities)
    #[serde(default = "default_resolution")]
    pub resolution: f64,

    /// Length of each centrality ranking
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    #[serde(default = "default_iterations")]
    pub louvain_max_iterations: usize,

    #[serde(default = "default_min_improvement")]
    pub min_improvement: f64,

    /// Shuffle seed for Louvain; unset keeps node insertion order
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,

    #[serde(default = "default_iterations")]
    pub pagerank_max_iterations: usize,

    #[serde(default = "default_pagerank_tolerance")]
    pub pagerank_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheSection {
    #[serde(default = "default_ttl_ms")]
    pub analytics_ttl_ms: u64,

    #[serde(default = "default_ttl_ms")]
    pub communities_ttl_ms: u64,
}

// Default values
fn default_include_entities() -> bool {
    true
}

fn default_max_nodes() -> usize {
    500
}

fn default_resolution() -> f64 {
    1.0
}

fn default_top_n() -> usize {
    10
}

fn default_iterations() -> usize {
    100
}

fn default_min_improvement() -> f64 {
    1e-6
}

fn default_damping_factor() -> f64 {
    0.85
}

fn default_pagerank_tolerance() -> f64 {
    1e-6
}

fn default_ttl_ms() -> u64 {
    300_000
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            include_entities: default_include_entities(),
            max_nodes: default_max_nodes(),
        }
    }
}

impl Default for AnalyticsSection {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            top_n: default_top_n(),
            louvain_max_iterations: default_iterations(),
            min_improvement: default_min_improvement(),
            seed: None,
            damping_factor: default_damping_factor(),
            pagerank_max_iterations: default_iterations(),
            pagerank_tolerance: default_pagerank_tolerance(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            analytics_ttl_ms: default_ttl_ms(),
            communities_ttl_ms: default_ttl_ms(),
        }
    }
}

fn parse_into<T, F>(target: &mut T, name: &str, lookup: &F)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        match raw.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Ignoring unparseable {}={:?}", name, raw),
        }
    }
}

impl InsightGraphConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - INSIGHTGRAPH_INCLUDE_ENTITIES: Add entity nodes (default: true)
    /// - INSIGHTGRAPH_MAX_NODES: Insight node cap (default: 500)
    /// - INSIGHTGRAPH_RESOLUTION: Louvain resolution (default: 1.0)
    /// - INSIGHTGRAPH_TOP_N: Ranking length (default: 10)
    /// - INSIGHTGRAPH_LOUVAIN_MAX_ITERATIONS (default: 100)
    /// - INSIGHTGRAPH_MIN_IMPROVEMENT (default: 1e-6)
    /// - INSIGHTGRAPH_SEED: Louvain shuffle seed (default: unset)
    /// - INSIGHTGRAPH_DAMPING_FACTOR: PageRank damping (default: 0.85)
    /// - INSIGHTGRAPH_PAGERANK_MAX_ITERATIONS (default: 100)
    /// - INSIGHTGRAPH_PAGERANK_TOLERANCE (default: 1e-6)
    /// - INSIGHTGRAPH_ANALYTICS_TTL_MS (default: 300000)
    /// - INSIGHTGRAPH_COMMUNITIES_TTL_MS (default: 300000)
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        Ok(Self::merge_with_env(config))
    }

    /// Merge config with environment variables (env takes priority)
    pub fn merge_with_env(config: Self) -> Self {
        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply every variable `lookup` knows about; unset ones leave the
    /// current value in place
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let g = &mut self.graph;
        parse_into(&mut g.include_entities, "INSIGHTGRAPH_INCLUDE_ENTITIES", &lookup);
        parse_into(&mut g.max_nodes, "INSIGHTGRAPH_MAX_NODES", &lookup);

        let a = &mut self.analytics;
        parse_into(&mut a.resolution, "INSIGHTGRAPH_RESOLUTION", &lookup);
        parse_into(&mut a.top_n, "INSIGHTGRAPH_TOP_N", &lookup);
        parse_into(&mut a.louvain_max_iterations, "INSIGHTGRAPH_LOUVAIN_MAX_ITERATIONS", &lookup);
        parse_into(&mut a.min_improvement, "INSIGHTGRAPH_MIN_IMPROVEMENT", &lookup);
        parse_into(&mut a.damping_factor, "INSIGHTGRAPH_DAMPING_FACTOR", &lookup);
        parse_into(&mut a.pagerank_max_iterations, "INSIGHTGRAPH_PAGERANK_MAX_ITERATIONS", &lookup);
        parse_into(&mut a.pagerank_tolerance, "INSIGHTGRAPH_PAGERANK_TOLERANCE", &lookup);

        // An empty seed clears a seed set in the file
        if let Some(raw) = lookup("INSIGHTGRAPH_SEED") {
            match raw.trim() {
                "" => a.seed = None,
                value => match value.parse() {
                    Ok(seed) => a.seed = Some(seed),
                    Err(_) => tracing::warn!("Ignoring unparseable INSIGHTGRAPH_SEED={:?}", raw),
                },
            }
        }

        let c = &mut self.cache;
        parse_into(&mut c.analytics_ttl_ms, "INSIGHTGRAPH_ANALYTICS_TTL_MS", &lookup);
        parse_into(&mut c.communities_ttl_ms, "INSIGHTGRAPH_COMMUNITIES_TTL_MS", &lookup);

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.analytics.resolution > 0.0) {
            return Err(InsightGraphError::Config(format!(
                "resolution must be positive, got {}",
                self.analytics.resolution
            )));
        }
        let d = self.analytics.damping_factor;
        if !(d > 0.0 && d < 1.0) {
            return Err(InsightGraphError::Config(format!(
                "damping_factor must be in (0, 1), got {}",
                d
            )));
        }
        if self.graph.max_nodes == 0 {
            return Err(InsightGraphError::Config("max_nodes must be at least 1".into()));
        }
        if self.analytics.top_n == 0 {
            return Err(InsightGraphError::Config("top_n must be at least 1".into()));
        }
        Ok(())
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            include_entities: self.graph.include_entities,
            max_nodes: self.graph.max_nodes,
        }
    }

    pub fn analytics_config(&self) -> AnalyticsConfig {
        let a = &self.analytics;
        AnalyticsConfig {
            louvain: LouvainConfig {
                resolution: a.resolution,
                max_iterations: a.louvain_max_iterations,
                min_improvement: a.min_improvement,
                seed: a.seed,
            },
            page_rank: PageRankConfig {
                damping_factor: a.damping_factor,
                max_iterations: a.pagerank_max_iterations,
                tolerance: a.pagerank_tolerance,
            },
            top_n: a.top_n,
        }
    }

    pub fn analytics_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.analytics_ttl_ms)
    }

    pub fn communities_ttl(&self) -> Duration {
        Duration::from_millis(self.cache.communities_ttl_ms)
    }
}
