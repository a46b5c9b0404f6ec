//! Core traits for arbor abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. Every collaborator
//! has at least one concrete implementation (in-memory or no-op) selected
//! at construction time; nothing is resolved through runtime type checks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::path::FolderPath;
use crate::vector::Vector;

// =============================================================================
// VECTOR INDEX
// =============================================================================

/// Restricts a vector search to, or away from, particular folders/concepts.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Hits placed in these folders are dropped.
    pub exclude_folders: Vec<Uuid>,
    /// When non-empty, only hits placed in these folders are returned.
    pub only_folders: Vec<Uuid>,
    /// These concepts are dropped (e.g. the candidate itself).
    pub exclude_concepts: Vec<Uuid>,
}

impl SearchFilter {
    pub fn excluding_folder(folder_id: Uuid) -> Self {
        Self {
            exclude_folders: vec![folder_id],
            ..Default::default()
        }
    }

    pub fn only_folder(folder_id: Uuid) -> Self {
        Self {
            only_folders: vec![folder_id],
            ..Default::default()
        }
    }
}

/// Vector index provider.
///
/// Upsert has full-replacement semantics: re-upserting a concept id
/// replaces its vector and entire placement (primary and references);
/// no stale memberships survive.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, concept_id: Uuid, vector: Vector, placement: Placement) -> Result<()>;

    /// Similarity search at or above `threshold`, best-first, at most
    /// `limit` hits. A concept placed in several folders yields one match
    /// per membership.
    async fn search(
        &self,
        vector: &Vector,
        threshold: f32,
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SimilarityMatch>>;

    /// All concepts placed (primary or reference) in the folder.
    async fn scroll_by_folder(&self, folder_id: Uuid) -> Result<Vec<(Uuid, Vector)>>;

    /// The canonical placement for a concept, if indexed.
    async fn placement(&self, concept_id: Uuid) -> Result<Option<Placement>>;

    async fn delete(&self, concept_id: Uuid) -> Result<()>;
}

// =============================================================================
// REPOSITORIES
// =============================================================================

/// Repository for concept artifacts.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn save(&self, artifact: Artifact) -> Result<()>;

    async fn find(&self, id: Uuid) -> Result<Option<Artifact>>;

    /// Point the artifact at the decision now governing its placement.
    async fn update_routing(&self, id: Uuid, decision_id: Uuid) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Total active concepts. Feeds the derived system state.
    async fn count(&self) -> Result<usize>;

    /// Creation timestamp, used to break duplicate-similarity ties in
    /// favor of the earliest-created artifact.
    async fn created_at(&self, id: Uuid) -> Result<Option<DateTime<Utc>>>;
}

/// Repository for folder aggregate records.
#[async_trait]
pub trait FolderRepository: Send + Sync {
    async fn create(&self, record: FolderRecord) -> Result<Uuid>;

    async fn find(&self, id: Uuid) -> Result<Option<FolderRecord>>;

    async fn find_by_path(&self, path: &FolderPath) -> Result<Option<FolderRecord>>;

    /// Optimistic update: fails with a concurrency error unless the
    /// record's version matches the stored version; bumps it on success.
    async fn update(&self, record: FolderRecord) -> Result<()>;

    async fn rename(&self, id: Uuid, new_path: FolderPath) -> Result<()>;

    /// Direct children of the given path.
    async fn list_children(&self, path: &FolderPath) -> Result<Vec<FolderRecord>>;

    async fn count(&self) -> Result<usize>;
}

// =============================================================================
// AUDIT
// =============================================================================

/// Append-only decision log.
///
/// Callers treat append failures as non-fatal: the engine swallows them,
/// logs, and retries asynchronously — an audit outage never fails routing.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, decision: &RoutingDecision) -> Result<()>;

    /// Most recent decisions, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<RoutingDecision>>;
}

// =============================================================================
// REVIEW QUEUE
// =============================================================================

/// Human review queue fed on ambiguous routing.
#[async_trait]
pub trait ReviewQueue: Send + Sync {
    async fn add_for_review(
        &self,
        candidate_id: Uuid,
        reason: ReviewReason,
        suggested: Vec<AlternativeFolder>,
    ) -> Result<()>;
}

/// No-op review queue for deployments without a human in the loop.
pub struct NoOpReviewQueue;

#[async_trait]
impl ReviewQueue for NoOpReviewQueue {
    async fn add_for_review(
        &self,
        _candidate_id: Uuid,
        _reason: ReviewReason,
        _suggested: Vec<AlternativeFolder>,
    ) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// EMBEDDING
// =============================================================================

/// Backend for generating text embeddings.
///
/// Implementations must surface failure causes as distinct error kinds:
/// timeouts as `Infrastructure` with the `timeout` context flag, quota
/// exhaustion as `BudgetExceeded`, and everything else as a generic
/// `Infrastructure` error.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts, one vector per input.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Expected dimension of produced vectors.
    fn dimension(&self) -> usize;

    /// Model name being used.
    fn model_name(&self) -> &str;
}
