//! Folder matching: rank existing folders against a candidate's context
//! vector.
//!
//! Raw index hits at or above the low-confidence threshold are grouped by
//! folder; each folder gets a composite score
//! `w_avg·avg + w_max·max + w_count·min(count, cap)/cap`, clamped to
//! [0, 1]. Each ranked folder retains its constituent matches so the
//! decision engine can build an auditable rationale.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use arbor_core::{
    FolderStatistics, Result, RoutingConfig, ScoringWeights, SearchFilter, SimilarityMatch,
    Vector, VectorIndex,
};

/// One folder ranked against a candidate, with its supporting matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderCandidate {
    pub folder_id: Uuid,
    /// Composite score in [0, 1].
    pub score: f32,
    pub average_similarity: f32,
    pub maximum_similarity: f32,
    pub match_count: usize,
    pub matches: Vec<SimilarityMatch>,
}

/// Composite score for one folder's match group.
pub fn composite_score(
    average: f32,
    maximum: f32,
    count: usize,
    weights: &ScoringWeights,
) -> f32 {
    let bounded_count = count.min(weights.count_cap) as f32 / weights.count_cap as f32;
    let score =
        weights.average * average + weights.maximum * maximum + weights.count_bonus * bounded_count;
    score.clamp(0.0, 1.0)
}

/// Ranks folders for a candidate's context vector.
pub struct FolderMatchingService {
    index: Arc<dyn VectorIndex>,
    config: RoutingConfig,
}

impl FolderMatchingService {
    pub fn new(index: Arc<dyn VectorIndex>, config: RoutingConfig) -> Self {
        Self { index, config }
    }

    /// Search, group by folder, score, and rank descending.
    ///
    /// Ties at equal score order by folder id so repeated invocations see
    /// the same ranking.
    pub async fn rank_folders(
        &self,
        context: &Vector,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<FolderCandidate>> {
        let hits = self
            .index
            .search(
                context,
                self.config.low_confidence_threshold,
                self.config.search_limit,
                filter,
            )
            .await?;

        let mut by_folder: HashMap<Uuid, Vec<SimilarityMatch>> = HashMap::new();
        for hit in hits {
            if let Some(folder_id) = hit.folder_id {
                by_folder.entry(folder_id).or_default().push(hit);
            }
        }

        let weights = &self.config.weights;
        let mut ranked: Vec<FolderCandidate> = by_folder
            .into_iter()
            .map(|(folder_id, matches)| {
                let count = matches.len();
                let sum: f32 = matches.iter().map(|m| m.score).sum();
                let average = sum / count as f32;
                let maximum = matches
                    .iter()
                    .map(|m| m.score)
                    .fold(f32::NEG_INFINITY, f32::max);
                FolderCandidate {
                    folder_id,
                    score: composite_score(average, maximum, count, weights),
                    average_similarity: average,
                    maximum_similarity: maximum,
                    match_count: count,
                    matches,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.folder_id.cmp(&b.folder_id))
        });

        debug!(
            result_count = ranked.len(),
            top_score = ranked.first().map(|c| c.score).unwrap_or(0.0),
            "folder ranking complete"
        );
        Ok(ranked)
    }

    /// Member count and mean placement confidence for one folder.
    pub async fn folder_statistics(&self, folder_id: Uuid) -> Result<FolderStatistics> {
        let members = self.index.scroll_by_folder(folder_id).await?;
        let mut total = 0.0f32;
        let mut with_confidence = 0usize;
        for (concept_id, _) in &members {
            if let Some(placement) = self.index.placement(*concept_id).await? {
                if let Some(confidence) = placement.confidences.get(&folder_id) {
                    total += confidence;
                    with_confidence += 1;
                }
            }
        }
        let mean_confidence = if with_confidence == 0 {
            0.0
        } else {
            total / with_confidence as f32
        };
        Ok(FolderStatistics {
            folder_id,
            member_count: members.len(),
            mean_confidence,
        })
    }

    /// Near matches already parked in the Unsorted folder.
    pub async fn find_unsorted_similar(
        &self,
        vector: &Vector,
        unsorted_folder_id: Uuid,
        threshold: f32,
    ) -> Result<Vec<SimilarityMatch>> {
        let filter = SearchFilter::only_folder(unsorted_folder_id);
        self.index
            .search(vector, threshold, self.config.search_limit, Some(&filter))
            .await
    }
}
