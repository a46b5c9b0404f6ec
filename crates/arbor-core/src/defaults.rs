//! Centralized default constants for the arbor system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section and document the rationale for the chosen value.

// =============================================================================
// HIERARCHY
// =============================================================================

/// Maximum folder hierarchy depth. Deeper paths fail validation.
pub const MAX_HIERARCHY_DEPTH: usize = 4;

/// Maximum characters per path segment.
pub const MAX_SEGMENT_LENGTH: usize = 50;

/// First segment of the human-review fallback root.
pub const UNSORTED_ROOT: &str = "Unsorted";

/// First segment of machine-proposed provisional folders.
pub const PROVISIONAL_ROOT: &str = "Provisional";

// =============================================================================
// ROUTING THRESHOLDS
// =============================================================================

/// Similarity at or above which an identity match is a duplicate.
/// Must stay above HIGH_CONFIDENCE_THRESHOLD (validated at startup).
pub const DUPLICATE_THRESHOLD: f32 = 0.97;

/// Composite folder score at or above which routing is automatic.
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.80;

/// Composite folder score at or above which a candidate is ambiguous
/// (parked in Unsorted and queued for human review) rather than unmatched.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.60;

/// Two folder scores within this distance of the top score are tied;
/// ties prefer the less specific (shallower) folder.
pub const SCORE_EPSILON: f32 = 0.02;

// =============================================================================
// SYSTEM MATURITY
// =============================================================================

/// Below this many total concepts the system is in bootstrap state and
/// clustering-based folder proposals are attempted.
pub const BOOTSTRAP_THRESHOLD: usize = 20;

/// At or above this many total concepts the system is mature.
pub const MATURE_THRESHOLD: usize = 200;

/// Maximum new-folder proposals per routing batch during bootstrap.
pub const BOOTSTRAP_BATCH_CAP: usize = 5;

// =============================================================================
// SEARCH
// =============================================================================

/// Search breadth for folder matching (raw hits before grouping).
pub const SEARCH_LIMIT: usize = 50;

/// Top-K for the near-identity duplicate search.
pub const DUPLICATE_SEARCH_LIMIT: usize = 5;

/// Alternatives attached to an ambiguous-routing review item.
pub const MAX_REVIEW_ALTERNATIVES: usize = 3;

/// Concurrent candidates routed within one batch.
pub const BATCH_CONCURRENCY: usize = 8;

// =============================================================================
// FOLDER SCORING WEIGHTS
// =============================================================================

/// Weight of the average in-folder similarity in the composite score.
pub const SCORE_WEIGHT_AVERAGE: f32 = 0.5;

/// Weight of the maximum in-folder similarity in the composite score.
pub const SCORE_WEIGHT_MAXIMUM: f32 = 0.3;

/// Weight of the bounded match-count bonus in the composite score.
pub const SCORE_WEIGHT_COUNT_BONUS: f32 = 0.2;

/// Match count at which the count bonus saturates.
pub const SCORE_COUNT_CAP: usize = 5;

// =============================================================================
// CLUSTERING
// =============================================================================

/// Pairwise similarity at or above which two concepts share a cluster.
pub const CLUSTER_SIMILARITY_THRESHOLD: f32 = 0.75;

/// Clusters smaller than this are discarded.
pub const MINIMUM_CLUSTER_SIZE: usize = 3;

/// Clusters larger than this are flagged for splitting (strategy is an
/// open product question; flagged clusters are skipped by bootstrap).
pub const MAXIMUM_CLUSTER_SIZE: usize = 12;

/// Exemplar vectors retained per folder aggregate.
pub const MAX_EXEMPLARS: usize = 5;

// =============================================================================
// DISCOVERY
// =============================================================================

/// Similarity floor for cross-folder discovery.
pub const RELEVANCE_THRESHOLD: f32 = 0.70;

/// Maximum discovered concepts per folder.
pub const DISCOVERY_LIMIT: usize = 10;

/// Same-depth discovery hits at or above this similarity are Parallel.
pub const PARALLEL_SIMILARITY: f32 = 0.85;

// =============================================================================
// REORGANIZATION
// =============================================================================

/// Recent decisions inspected per reorganization analysis pass.
pub const REORG_WINDOW: usize = 50;

/// Minimum decisions in the window before analysis is meaningful.
pub const REORG_MIN_DECISIONS: usize = 10;

/// Share of the window routed to one folder that triggers analysis.
pub const REORG_CONCENTRATION: f32 = 0.6;

/// Folder coherence below which a reorganization is proposed.
pub const REORG_COHERENCE_FLOOR: f32 = 0.55;

// =============================================================================
// RETRY & TIMEOUTS
// =============================================================================

/// Maximum attempts for a failed vector-search or embedding call.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Base backoff between retries in milliseconds (doubles per attempt).
pub const RETRY_BACKOFF_MS: u64 = 250;

/// Timeout for vector index calls in seconds.
pub const SEARCH_TIMEOUT_SECS: u64 = 10;

/// Timeout for embedding requests in seconds.
pub const EMBED_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding endpoint (Ollama-compatible).
pub const EMBED_URL: &str = "http://127.0.0.1:11434";

/// Default embedding model name.
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

// =============================================================================
// AUDIT
// =============================================================================

/// Asynchronous re-append attempts after a failed audit write.
pub const AUDIT_RETRY_ATTEMPTS: u32 = 2;

/// Delay before an asynchronous audit re-append in milliseconds.
pub const AUDIT_RETRY_DELAY_MS: u64 = 500;
