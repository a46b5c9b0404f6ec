//! Structured logging schema and field name constants for arbor.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (search hits, cluster members) |

use tracing_subscriber::EnvFilter;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "search", "index", "embed"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "folder_matching", "duplicate_check", "aggregate_writer"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "route", "rank_folders", "embed_texts", "analyze"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Candidate UUID being routed.
pub const CANDIDATE_ID: &str = "candidate_id";

/// Folder UUID being operated on.
pub const FOLDER_ID: &str = "folder_id";

/// Routing decision UUID.
pub const DECISION_ID: &str = "decision_id";

/// Decision action label ("route", "create_folder", "duplicate",
/// "unsorted", "reorganize").
pub const DECISION: &str = "decision";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search.
pub const RESULT_COUNT: &str = "result_count";

/// Composite or similarity score.
pub const SCORE: &str = "score";

/// Decision confidence in [0, 1].
pub const CONFIDENCE: &str = "confidence";

/// Derived system maturity ("bootstrap", "growing", "mature").
pub const SYSTEM_STATE: &str = "system_state";

/// Cluster coherence in [0, 1].
pub const COHERENCE: &str = "coherence";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Retry attempt number (1-based).
pub const RETRY_ATTEMPT: &str = "retry_attempt";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Whether a degraded fallback was applied.
pub const DEGRADED: &str = "degraded";

/// Initialize the global tracing subscriber with env-filter support.
///
/// Reads `RUST_LOG` (default `info`). Call once from the composition root;
/// subsequent calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
