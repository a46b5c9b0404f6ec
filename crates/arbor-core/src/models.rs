//! Domain models for routing, clustering, and placement.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RoutingConfig;
use crate::path::FolderPath;
use crate::vector::{Vector, VectorEmbedding};

// =============================================================================
// CANDIDATES & ARTIFACTS
// =============================================================================

/// A unit of captured text awaiting placement. The id is hash-derived from
/// the content so repeated captures are idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    /// Embedding of the title/identity text, used for duplicate detection.
    pub identity: VectorEmbedding,
    /// Embedding of the full context, used for folder matching.
    pub context: VectorEmbedding,
}

/// A persisted concept artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub title: String,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    /// The decision currently governing this artifact's placement.
    pub decision_id: Option<Uuid>,
}

// =============================================================================
// FOLDERS
// =============================================================================

/// Aggregate state of one folder in the hierarchy.
///
/// Owned and mutated only by the routing/clustering subsystem; the
/// `version` field supports optimistic concurrency on updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: Uuid,
    pub path: FolderPath,
    pub centroid: Vector,
    pub exemplars: Vec<Vector>,
    pub member_count: usize,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl FolderRecord {
    /// A fresh, empty folder at the given path.
    pub fn new(path: FolderPath) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            centroid: Vector::new(Vec::new()),
            exemplars: Vec::new(),
            member_count: 0,
            updated_at: Utc::now(),
            version: 0,
        }
    }
}

/// Member count and mean placement confidence for one folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderStatistics {
    pub folder_id: Uuid,
    pub member_count: usize,
    pub mean_confidence: f32,
}

// =============================================================================
// SEARCH RESULTS
// =============================================================================

/// One vector-search hit. Transient, produced per search call.
///
/// `folder_id` is None for concepts indexed before their first placement
/// (identity vectors awaiting routing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub concept_id: Uuid,
    pub folder_id: Option<Uuid>,
    /// Cosine similarity in [0, 1].
    pub score: f32,
    pub is_primary: bool,
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// The single canonical in-memory placement record.
///
/// Legacy index payloads carrying only `folder_id` are normalized into this
/// shape at the index-adapter boundary; nothing downstream branches on
/// legacy-ness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub concept_id: Uuid,
    pub primary_folder: Option<Uuid>,
    pub reference_folders: Vec<Uuid>,
    /// Per-folder placement confidence.
    pub confidences: HashMap<Uuid, f32>,
}

impl Placement {
    /// An unplaced concept.
    pub fn unplaced(concept_id: Uuid) -> Self {
        Self {
            concept_id,
            ..Default::default()
        }
    }

    /// A primary-only placement.
    pub fn primary(concept_id: Uuid, folder_id: Uuid, confidence: f32) -> Self {
        Self {
            concept_id,
            primary_folder: Some(folder_id),
            reference_folders: Vec::new(),
            confidences: HashMap::from([(folder_id, confidence)]),
        }
    }

    /// All folders this concept belongs to, primary first.
    pub fn folders(&self) -> Vec<Uuid> {
        let mut out = Vec::with_capacity(1 + self.reference_folders.len());
        if let Some(primary) = self.primary_folder {
            out.push(primary);
        }
        out.extend(self.reference_folders.iter().copied());
        out
    }

    /// Whether this concept is placed in the given folder.
    pub fn contains(&self, folder_id: Uuid) -> bool {
        self.primary_folder == Some(folder_id) || self.reference_folders.contains(&folder_id)
    }
}

// =============================================================================
// ROUTING DECISIONS
// =============================================================================

/// Specification of a new folder proposed by clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFolderSpec {
    pub path: FolderPath,
    pub member_ids: Vec<Uuid>,
    pub coherence: f32,
}

/// Advisory proposal to restructure one folder into subfolders.
/// Requires separate human approval before any mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorganizationPlan {
    pub target_folder: Uuid,
    pub proposed_subfolders: Vec<NewFolderSpec>,
    /// Projected coherence improvement in [0, 1].
    pub improvement: f32,
    pub rationale: String,
}

/// The five routing outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoutingAction {
    /// Attach the candidate to an existing folder.
    Route { folder_id: Uuid },
    /// Create a new (provisional) folder for a bootstrap cluster.
    CreateFolder { spec: NewFolderSpec },
    /// The candidate duplicates an existing artifact.
    Duplicate { existing_id: Uuid },
    /// Park in /Unsorted for human review.
    Unsorted,
    /// Advisory structural reorganization.
    Reorganize { plan: ReorganizationPlan },
}

impl RoutingAction {
    /// Short label for logs and audit queries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Route { .. } => "route",
            Self::CreateFolder { .. } => "create_folder",
            Self::Duplicate { .. } => "duplicate",
            Self::Unsorted => "unsorted",
            Self::Reorganize { .. } => "reorganize",
        }
    }
}

/// One signal that contributed to a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub value: f32,
}

impl Signal {
    pub fn new(name: impl Into<String>, value: f32) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A folder that was considered but not chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeFolder {
    pub folder_id: Uuid,
    pub path: FolderPath,
    pub score: f32,
}

/// Auditable account of why a decision was made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRationale {
    pub summary: String,
    pub signals: Vec<Signal>,
    pub alternatives: Vec<AlternativeFolder>,
}

impl DecisionRationale {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            signals: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: f32) -> Self {
        self.signals.push(Signal::new(name, value));
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<AlternativeFolder>) -> Self {
        self.alternatives = alternatives;
        self
    }
}

/// One immutable routing decision. Corrections are new decisions that
/// supersede via `supersedes`, never in-place edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub action: RoutingAction,
    /// Confidence in [0, 1]. Degraded decisions carry 0.
    pub confidence: f32,
    pub rationale: DecisionRationale,
    pub decided_at: DateTime<Utc>,
    pub supersedes: Option<Uuid>,
}

impl RoutingDecision {
    pub fn new(
        candidate_id: Uuid,
        action: RoutingAction,
        confidence: f32,
        rationale: DecisionRationale,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            action,
            confidence: confidence.clamp(0.0, 1.0),
            rationale,
            decided_at: Utc::now(),
            supersedes: None,
        }
    }

    /// A correction that supersedes an earlier decision.
    pub fn superseding(mut self, earlier: Uuid) -> Self {
        self.supersedes = Some(earlier);
        self
    }
}

// =============================================================================
// DUPLICATE DETECTION
// =============================================================================

/// The chosen duplicate, when one qualifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub existing_id: Uuid,
    pub similarity: f32,
    pub rationale: String,
}

/// Outcome of the near-identity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    pub matched: Option<DuplicateMatch>,
}

impl DuplicateCheckResult {
    pub fn none() -> Self {
        Self {
            is_duplicate: false,
            matched: None,
        }
    }

    pub fn found(matched: DuplicateMatch) -> Self {
        Self {
            is_duplicate: true,
            matched: Some(matched),
        }
    }
}

// =============================================================================
// CLUSTERING
// =============================================================================

/// What to do with a discovered cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// The cluster is large and coherent enough to warrant its own folder.
    CreateFolder,
    /// Route the members together into the best existing folder.
    RouteTogether,
}

/// A group of concepts discovered by threshold clustering. Transient,
/// produced for bootstrap and reorganization analysis only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub members: Vec<Uuid>,
    pub centroid: Vector,
    /// Mean pairwise cosine similarity in [0, 1].
    pub coherence: f32,
    pub suggested_action: SuggestedAction,
    /// Set when the cluster exceeds the configured maximum size. The
    /// splitting strategy is an open product question; flagged clusters
    /// are skipped by bootstrap proposals.
    pub needs_split: bool,
}

// =============================================================================
// SYSTEM STATE
// =============================================================================

/// Maturity of the whole hierarchy. Derived, never stored; monotonic in
/// the total concept count for fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemState {
    Bootstrap,
    Growing,
    Mature,
}

impl SystemState {
    /// Classify from the total concept count.
    pub fn classify(total_concepts: usize, config: &RoutingConfig) -> Self {
        if total_concepts < config.bootstrap_threshold {
            Self::Bootstrap
        } else if total_concepts < config.mature_threshold {
            Self::Growing
        } else {
            Self::Mature
        }
    }
}

impl std::fmt::Display for SystemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::Growing => write!(f, "growing"),
            Self::Mature => write!(f, "mature"),
        }
    }
}

// =============================================================================
// REVIEW
// =============================================================================

/// Why a candidate was queued for human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewReason {
    /// Best folder score fell in the ambiguous band.
    AmbiguousRouting,
    /// Vector search degraded; routed to Unsorted with zero confidence.
    InfrastructureDegraded,
}

impl std::fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmbiguousRouting => write!(f, "ambiguous-routing"),
            Self::InfrastructureDegraded => write!(f, "infrastructure-degraded"),
        }
    }
}

// =============================================================================
// DISCOVERY
// =============================================================================

/// Heuristic relationship between a source folder and a discovered concept,
/// assigned from the similarity band and the depth relation between the
/// source and target folders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Target folder is shallower (more general) than the source.
    Prerequisite,
    /// Target folder is deeper (more specialized) than the source.
    Advanced,
    /// Same depth, strong similarity.
    Parallel,
    /// Same depth, provisional target.
    Application,
    Related,
}

/// A concept found in another folder, for read-time enrichment only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredConcept {
    pub concept_id: Uuid,
    pub folder_id: Uuid,
    pub similarity: f32,
    pub relationship: RelationshipKind,
    /// How the concept was found (e.g. "centroid-similarity").
    pub discovery_method: String,
}
