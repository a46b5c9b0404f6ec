//! Routing configuration, validated at startup.
//!
//! Every threshold and limit lives here, with defaults sourced from
//! [`crate::defaults`]. `validate()` enforces the ordering invariant
//! `duplicate > high > low`; a violating config aborts startup with a
//! configuration error instead of degrading silently.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Weights for the per-folder composite score:
/// `average·avg + maximum·max + count_bonus·min(count, cap)/cap`.
///
/// For well-formed weights (non-negative, summing to at most 1) the
/// composite stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub average: f32,
    pub maximum: f32,
    pub count_bonus: f32,
    /// Match count at which the bonus saturates.
    pub count_cap: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            average: defaults::SCORE_WEIGHT_AVERAGE,
            maximum: defaults::SCORE_WEIGHT_MAXIMUM,
            count_bonus: defaults::SCORE_WEIGHT_COUNT_BONUS,
            count_cap: defaults::SCORE_COUNT_CAP,
        }
    }
}

/// Thresholds for connected-component clustering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Pairwise similarity at or above which two concepts share a cluster.
    pub similarity_threshold: f32,
    pub minimum_cluster_size: usize,
    pub maximum_cluster_size: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: defaults::CLUSTER_SIMILARITY_THRESHOLD,
            minimum_cluster_size: defaults::MINIMUM_CLUSTER_SIZE,
            maximum_cluster_size: defaults::MAXIMUM_CLUSTER_SIZE,
        }
    }
}

/// Cross-folder discovery settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    pub relevance_threshold: f32,
    pub limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            relevance_threshold: defaults::RELEVANCE_THRESHOLD,
            limit: defaults::DISCOVERY_LIMIT,
        }
    }
}

/// Bounded retry policy for infrastructure calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Base backoff; doubles per attempt.
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            backoff_ms: defaults::RETRY_BACKOFF_MS,
        }
    }
}

/// Top-level routing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Identity similarity at or above which a candidate is a duplicate.
    pub duplicate_threshold: f32,
    /// Composite score at or above which routing is automatic.
    pub high_confidence_threshold: f32,
    /// Composite score at or above which a candidate is ambiguous
    /// (inclusive boundary: a score exactly at this value is ambiguous).
    pub low_confidence_threshold: f32,
    /// Scores within this distance of the top score are tied.
    pub score_epsilon: f32,

    /// Below this total concept count the system is in bootstrap state.
    pub bootstrap_threshold: usize,
    /// At or above this total concept count the system is mature.
    pub mature_threshold: usize,
    /// Maximum clustering-based folder proposals per batch.
    pub bootstrap_batch_cap: usize,

    /// Raw search breadth for folder matching.
    pub search_limit: usize,
    /// Top-K for the near-identity duplicate search.
    pub duplicate_search_limit: usize,
    /// Alternatives attached to an ambiguous-routing review item.
    pub max_review_alternatives: usize,
    /// Concurrent candidates per routing batch.
    pub batch_concurrency: usize,

    /// Decisions inspected per reorganization pass.
    pub reorg_window: usize,
    /// Minimum decisions in the window before analysis runs.
    pub reorg_min_decisions: usize,
    /// Share of the window on one folder that triggers analysis.
    pub reorg_concentration: f32,
    /// Folder coherence below which reorganization is proposed.
    pub reorg_coherence_floor: f32,

    /// Timeout for vector index calls in seconds.
    pub search_timeout_secs: u64,
    /// Timeout for embedding calls in seconds.
    pub embed_timeout_secs: u64,

    pub weights: ScoringWeights,
    pub clustering: ClusteringConfig,
    pub discovery: DiscoveryConfig,
    pub retry: RetryConfig,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: defaults::DUPLICATE_THRESHOLD,
            high_confidence_threshold: defaults::HIGH_CONFIDENCE_THRESHOLD,
            low_confidence_threshold: defaults::LOW_CONFIDENCE_THRESHOLD,
            score_epsilon: defaults::SCORE_EPSILON,
            bootstrap_threshold: defaults::BOOTSTRAP_THRESHOLD,
            mature_threshold: defaults::MATURE_THRESHOLD,
            bootstrap_batch_cap: defaults::BOOTSTRAP_BATCH_CAP,
            search_limit: defaults::SEARCH_LIMIT,
            duplicate_search_limit: defaults::DUPLICATE_SEARCH_LIMIT,
            max_review_alternatives: defaults::MAX_REVIEW_ALTERNATIVES,
            batch_concurrency: defaults::BATCH_CONCURRENCY,
            reorg_window: defaults::REORG_WINDOW,
            reorg_min_decisions: defaults::REORG_MIN_DECISIONS,
            reorg_concentration: defaults::REORG_CONCENTRATION,
            reorg_coherence_floor: defaults::REORG_COHERENCE_FLOOR,
            search_timeout_secs: defaults::SEARCH_TIMEOUT_SECS,
            embed_timeout_secs: defaults::EMBED_TIMEOUT_SECS,
            weights: ScoringWeights::default(),
            clustering: ClusteringConfig::default(),
            discovery: DiscoveryConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl RoutingConfig {
    /// Create config from environment variables (with defaults), then
    /// validate.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `ARBOR_DUPLICATE_THRESHOLD` | `0.97` |
    /// | `ARBOR_HIGH_CONFIDENCE_THRESHOLD` | `0.80` |
    /// | `ARBOR_LOW_CONFIDENCE_THRESHOLD` | `0.60` |
    /// | `ARBOR_BOOTSTRAP_THRESHOLD` | `20` |
    /// | `ARBOR_MATURE_THRESHOLD` | `200` |
    /// | `ARBOR_SEARCH_LIMIT` | `50` |
    /// | `ARBOR_SEARCH_TIMEOUT_SECS` | `10` |
    pub fn from_env() -> Result<Self> {
        fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|v| v.parse::<T>().ok())
                .unwrap_or(default)
        }

        let config = Self {
            duplicate_threshold: env_parse(
                "ARBOR_DUPLICATE_THRESHOLD",
                defaults::DUPLICATE_THRESHOLD,
            ),
            high_confidence_threshold: env_parse(
                "ARBOR_HIGH_CONFIDENCE_THRESHOLD",
                defaults::HIGH_CONFIDENCE_THRESHOLD,
            ),
            low_confidence_threshold: env_parse(
                "ARBOR_LOW_CONFIDENCE_THRESHOLD",
                defaults::LOW_CONFIDENCE_THRESHOLD,
            ),
            bootstrap_threshold: env_parse(
                "ARBOR_BOOTSTRAP_THRESHOLD",
                defaults::BOOTSTRAP_THRESHOLD,
            ),
            mature_threshold: env_parse("ARBOR_MATURE_THRESHOLD", defaults::MATURE_THRESHOLD),
            search_limit: env_parse("ARBOR_SEARCH_LIMIT", defaults::SEARCH_LIMIT),
            search_timeout_secs: env_parse(
                "ARBOR_SEARCH_TIMEOUT_SECS",
                defaults::SEARCH_TIMEOUT_SECS,
            ),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the three routing thresholds.
    pub fn with_thresholds(mut self, duplicate: f32, high: f32, low: f32) -> Self {
        self.duplicate_threshold = duplicate;
        self.high_confidence_threshold = high;
        self.low_confidence_threshold = low;
        self
    }

    /// Override the scoring weights.
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Override the maturity thresholds.
    pub fn with_maturity(mut self, bootstrap: usize, mature: usize) -> Self {
        self.bootstrap_threshold = bootstrap;
        self.mature_threshold = mature;
        self
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Validate the whole configuration. Violations are fatal
    /// configuration errors; they must abort startup.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("duplicate_threshold", self.duplicate_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("low_confidence_threshold", self.low_confidence_threshold),
            ("reorg_concentration", self.reorg_concentration),
            ("reorg_coherence_floor", self.reorg_coherence_floor),
            (
                "clustering.similarity_threshold",
                self.clustering.similarity_threshold,
            ),
            (
                "discovery.relevance_threshold",
                self.discovery.relevance_threshold,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::configuration(format!(
                    "{name} must be in [0, 1], got {value}"
                ))
                .with_context("field", name));
            }
        }

        if !(self.duplicate_threshold > self.high_confidence_threshold
            && self.high_confidence_threshold > self.low_confidence_threshold)
        {
            return Err(Error::configuration(format!(
                "threshold ordering violated: duplicate ({}) > high ({}) > low ({}) required",
                self.duplicate_threshold,
                self.high_confidence_threshold,
                self.low_confidence_threshold
            )));
        }

        if self.score_epsilon < 0.0 {
            return Err(Error::configuration("score_epsilon must be non-negative"));
        }

        if self.bootstrap_threshold >= self.mature_threshold {
            return Err(Error::configuration(format!(
                "bootstrap_threshold ({}) must be below mature_threshold ({})",
                self.bootstrap_threshold, self.mature_threshold
            )));
        }

        let w = &self.weights;
        if w.average < 0.0 || w.maximum < 0.0 || w.count_bonus < 0.0 {
            return Err(Error::configuration("scoring weights must be non-negative"));
        }
        let sum = w.average + w.maximum + w.count_bonus;
        if sum > 1.0 + f32::EPSILON {
            return Err(Error::configuration(format!(
                "scoring weights sum to {sum}, must not exceed 1.0"
            )));
        }
        if w.count_cap == 0 {
            return Err(Error::configuration("weights.count_cap must be at least 1"));
        }

        let c = &self.clustering;
        if c.minimum_cluster_size == 0 || c.minimum_cluster_size > c.maximum_cluster_size {
            return Err(Error::configuration(format!(
                "cluster size bounds invalid: minimum {} maximum {}",
                c.minimum_cluster_size, c.maximum_cluster_size
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(Error::configuration("retry.max_attempts must be at least 1"));
        }

        if self.search_limit == 0 || self.duplicate_search_limit == 0 {
            return Err(Error::configuration("search limits must be at least 1"));
        }

        if self.batch_concurrency == 0 {
            return Err(Error::configuration("batch_concurrency must be at least 1"));
        }

        Ok(())
    }
}
