//! Near-identity duplicate detection.
//!
//! Searches existing identity vectors at or above the duplicate threshold
//! and, when any qualify, picks the single highest-similarity match (ties
//! broken by earliest-created artifact). Runs and completes before folder
//! matching for the same candidate: a duplicate never also receives a
//! route or create-folder decision.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use arbor_core::{
    ArtifactRepository, DuplicateCheckResult, DuplicateMatch, Result, RoutingConfig,
    SearchFilter, Vector, VectorIndex,
};

/// Threshold-gated duplicate verdict over identity vectors.
pub struct DuplicateDetectionService {
    index: Arc<dyn VectorIndex>,
    artifacts: Arc<dyn ArtifactRepository>,
    config: RoutingConfig,
}

impl DuplicateDetectionService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        artifacts: Arc<dyn ArtifactRepository>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            index,
            artifacts,
            config,
        }
    }

    /// Check a candidate's identity vector against existing concepts.
    ///
    /// An empty result simply means "not a duplicate"; it is never
    /// retried.
    pub async fn check(
        &self,
        candidate_id: Uuid,
        identity: &Vector,
    ) -> Result<DuplicateCheckResult> {
        let filter = SearchFilter {
            exclude_concepts: vec![candidate_id],
            ..Default::default()
        };
        let hits = self
            .index
            .search(
                identity,
                self.config.duplicate_threshold,
                self.config.duplicate_search_limit,
                Some(&filter),
            )
            .await?;

        if hits.is_empty() {
            return Ok(DuplicateCheckResult::none());
        }

        // A multi-folder concept appears once per membership; collapse to
        // one (concept, score) entry each.
        let mut best_per_concept: Vec<(Uuid, f32)> = Vec::new();
        for hit in &hits {
            match best_per_concept.iter_mut().find(|(id, _)| *id == hit.concept_id) {
                Some((_, score)) => *score = score.max(hit.score),
                None => best_per_concept.push((hit.concept_id, hit.score)),
            }
        }

        // Highest similarity wins; ties go to the earliest-created artifact.
        let top_score = best_per_concept
            .iter()
            .map(|(_, score)| *score)
            .fold(f32::NEG_INFINITY, f32::max);
        let mut tied: Vec<Uuid> = best_per_concept
            .iter()
            .filter(|(_, score)| *score == top_score)
            .map(|(id, _)| *id)
            .collect();

        let winner = if tied.len() == 1 {
            tied[0]
        } else {
            let mut earliest = (tied[0], self.artifacts.created_at(tied[0]).await?);
            tied.sort();
            for id in tied {
                let created = self.artifacts.created_at(id).await?;
                let earlier = match (&earliest.1, &created) {
                    (Some(a), Some(b)) => b < a,
                    (None, Some(_)) => true,
                    _ => false,
                };
                if earlier {
                    earliest = (id, created);
                }
            }
            earliest.0
        };

        debug!(
            existing_id = %winner,
            score = top_score,
            candidates = best_per_concept.len(),
            "duplicate detected"
        );

        Ok(DuplicateCheckResult::found(DuplicateMatch {
            existing_id: winner,
            similarity: top_score,
            rationale: format!(
                "identity similarity {top_score:.4} at or above duplicate threshold {:.4}",
                self.config.duplicate_threshold
            ),
        }))
    }
}
