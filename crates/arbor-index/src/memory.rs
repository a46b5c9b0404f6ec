//! In-memory vector index.
//!
//! Brute-force cosine scan over a `RwLock`-guarded map. Suitable for tests
//! and single-process deployments; a remote index adapter satisfies the
//! same [`VectorIndex`] trait for production use.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use arbor_core::{
    cosine_similarity, Placement, Result, SearchFilter, SimilarityMatch, Vector, VectorIndex,
};

use crate::payload::IndexPayload;

struct IndexRecord {
    vector: Vector,
    placement: Placement,
}

/// In-memory [`VectorIndex`] with full-replacement upsert semantics.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<HashMap<Uuid, IndexRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexed concepts.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Ingest a serialized payload, normalizing legacy records at this
    /// boundary. Everything downstream sees only canonical placements.
    pub async fn upsert_payload(&self, vector: Vector, payload: IndexPayload) -> Result<()> {
        let placement = payload.normalize();
        self.upsert(placement.concept_id, vector, placement).await
    }
}

fn passes_filter(placement: &Placement, filter: Option<&SearchFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if filter.exclude_concepts.contains(&placement.concept_id) {
        return false;
    }
    true
}

fn folder_passes(folder_id: Option<Uuid>, filter: Option<&SearchFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    if let Some(id) = folder_id {
        if filter.exclude_folders.contains(&id) {
            return false;
        }
        if !filter.only_folders.is_empty() && !filter.only_folders.contains(&id) {
            return false;
        }
    } else if !filter.only_folders.is_empty() {
        return false;
    }
    true
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, concept_id: Uuid, vector: Vector, placement: Placement) -> Result<()> {
        let mut records = self.records.write().await;
        // Full replacement: the previous record (vector and all folder
        // memberships) is dropped wholesale.
        records.insert(concept_id, IndexRecord { vector, placement });
        trace!(concept_id = %concept_id, "index upsert");
        Ok(())
    }

    async fn search(
        &self,
        vector: &Vector,
        threshold: f32,
        limit: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<SimilarityMatch>> {
        let records = self.records.read().await;
        let mut hits: Vec<SimilarityMatch> = Vec::new();

        for record in records.values() {
            if !passes_filter(&record.placement, filter) {
                continue;
            }
            let score = cosine_similarity(vector, &record.vector);
            if score < threshold {
                continue;
            }
            let folders = record.placement.folders();
            if folders.is_empty() {
                // Indexed before first placement; still reachable for
                // identity searches.
                if folder_passes(None, filter) {
                    hits.push(SimilarityMatch {
                        concept_id: record.placement.concept_id,
                        folder_id: None,
                        score,
                        is_primary: false,
                    });
                }
                continue;
            }
            for folder_id in folders {
                if !folder_passes(Some(folder_id), filter) {
                    continue;
                }
                hits.push(SimilarityMatch {
                    concept_id: record.placement.concept_id,
                    folder_id: Some(folder_id),
                    score,
                    is_primary: record.placement.primary_folder == Some(folder_id),
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.concept_id.cmp(&b.concept_id))
        });
        hits.truncate(limit);

        debug!(
            result_count = hits.len(),
            threshold, "in-memory vector search complete"
        );
        Ok(hits)
    }

    async fn scroll_by_folder(&self, folder_id: Uuid) -> Result<Vec<(Uuid, Vector)>> {
        let records = self.records.read().await;
        let mut members: Vec<(Uuid, Vector)> = records
            .values()
            .filter(|r| r.placement.contains(folder_id))
            .map(|r| (r.placement.concept_id, r.vector.clone()))
            .collect();
        members.sort_by_key(|(id, _)| *id);
        Ok(members)
    }

    async fn placement(&self, concept_id: Uuid) -> Result<Option<Placement>> {
        let records = self.records.read().await;
        Ok(records.get(&concept_id).map(|r| r.placement.clone()))
    }

    async fn delete(&self, concept_id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        records.remove(&concept_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(x: f32, y: f32) -> Vector {
        let norm = (x * x + y * y).sqrt();
        Vector::new(vec![x / norm, y / norm])
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let index = InMemoryVectorIndex::new();
        let folder = Uuid::new_v4();
        let concept = Uuid::new_v4();

        index
            .upsert(concept, unit(1.0, 0.0), Placement::primary(concept, folder, 0.9))
            .await
            .unwrap();

        let hits = index.search(&unit(1.0, 0.1), 0.5, 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].concept_id, concept);
        assert_eq!(hits[0].folder_id, Some(folder));
        assert!(hits[0].is_primary);
    }

    #[tokio::test]
    async fn test_search_threshold_excludes_dissimilar() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        index
            .upsert(
                concept,
                unit(0.0, 1.0),
                Placement::primary(concept, Uuid::new_v4(), 0.9),
            )
            .await
            .unwrap();

        let hits = index.search(&unit(1.0, 0.0), 0.5, 10, None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_multi_folder_concept_yields_match_per_membership() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        let primary = Uuid::new_v4();
        let reference = Uuid::new_v4();

        let mut placement = Placement::primary(concept, primary, 0.9);
        placement.reference_folders.push(reference);
        placement.confidences.insert(reference, 0.7);

        index.upsert(concept, unit(1.0, 0.0), placement).await.unwrap();

        let hits = index.search(&unit(1.0, 0.0), 0.5, 10, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        let primary_hit = hits.iter().find(|h| h.folder_id == Some(primary)).unwrap();
        let reference_hit = hits.iter().find(|h| h.folder_id == Some(reference)).unwrap();
        assert!(primary_hit.is_primary);
        assert!(!reference_hit.is_primary);
    }

    #[tokio::test]
    async fn test_reupsert_full_replacement_no_stale_membership() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        let sorting = Uuid::new_v4();
        let heaps = Uuid::new_v4();
        let advanced = Uuid::new_v4();
        let complexity = Uuid::new_v4();

        // First placement: primary=sorting, references=[heaps]
        let mut first = Placement::primary(concept, sorting, 0.9);
        first.reference_folders.push(heaps);
        index.upsert(concept, unit(1.0, 0.0), first).await.unwrap();

        // Re-upsert: primary=advanced, references=[complexity]
        let mut second = Placement::primary(concept, advanced, 0.8);
        second.reference_folders.push(complexity);
        index.upsert(concept, unit(1.0, 0.0), second).await.unwrap();

        // Zero membership in the old folders
        assert!(index.scroll_by_folder(sorting).await.unwrap().is_empty());
        assert!(index.scroll_by_folder(heaps).await.unwrap().is_empty());
        // Membership in the new folders
        assert_eq!(index.scroll_by_folder(advanced).await.unwrap().len(), 1);
        assert_eq!(index.scroll_by_folder(complexity).await.unwrap().len(), 1);

        let hits = index.search(&unit(1.0, 0.0), 0.5, 10, None).await.unwrap();
        let folders: Vec<Uuid> = hits.iter().filter_map(|h| h.folder_id).collect();
        assert!(!folders.contains(&sorting));
        assert!(!folders.contains(&heaps));
        assert!(folders.contains(&advanced));
        assert!(folders.contains(&complexity));
    }

    #[tokio::test]
    async fn test_filter_exclude_and_only_folders() {
        let index = InMemoryVectorIndex::new();
        let folder_a = Uuid::new_v4();
        let folder_b = Uuid::new_v4();
        for folder in [folder_a, folder_b] {
            let concept = Uuid::new_v4();
            index
                .upsert(concept, unit(1.0, 0.0), Placement::primary(concept, folder, 0.9))
                .await
                .unwrap();
        }

        let filter = SearchFilter::excluding_folder(folder_a);
        let hits = index
            .search(&unit(1.0, 0.0), 0.5, 10, Some(&filter))
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.folder_id == Some(folder_b)));

        let filter = SearchFilter::only_folder(folder_a);
        let hits = index
            .search(&unit(1.0, 0.0), 0.5, 10, Some(&filter))
            .await
            .unwrap();
        assert!(hits.iter().all(|h| h.folder_id == Some(folder_a)));
    }

    #[tokio::test]
    async fn test_filter_exclude_concept() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        index
            .upsert(
                concept,
                unit(1.0, 0.0),
                Placement::primary(concept, Uuid::new_v4(), 0.9),
            )
            .await
            .unwrap();

        let filter = SearchFilter {
            exclude_concepts: vec![concept],
            ..Default::default()
        };
        let hits = index
            .search(&unit(1.0, 0.0), 0.5, 10, Some(&filter))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_unplaced_concept_searchable_without_folder() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        index
            .upsert(concept, unit(1.0, 0.0), Placement::unplaced(concept))
            .await
            .unwrap();

        let hits = index.search(&unit(1.0, 0.0), 0.5, 10, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].folder_id, None);
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_ordering() {
        let index = InMemoryVectorIndex::new();
        let folder = Uuid::new_v4();
        for i in 0..20 {
            let concept = Uuid::new_v4();
            // Progressively less similar to the x axis
            let angle = 0.02 * i as f32;
            index
                .upsert(
                    concept,
                    unit(angle.cos(), angle.sin()),
                    Placement::primary(concept, folder, 0.9),
                )
                .await
                .unwrap();
        }

        let hits = index.search(&unit(1.0, 0.0), 0.0, 5, None).await.unwrap();
        assert_eq!(hits.len(), 5);
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_delete_removes_concept() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        index
            .upsert(
                concept,
                unit(1.0, 0.0),
                Placement::primary(concept, Uuid::new_v4(), 0.9),
            )
            .await
            .unwrap();
        assert_eq!(index.len().await, 1);

        index.delete(concept).await.unwrap();
        assert!(index.is_empty().await);
        assert!(index.placement(concept).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_payload_normalizes_legacy() {
        let index = InMemoryVectorIndex::new();
        let concept = Uuid::new_v4();
        let folder = Uuid::new_v4();

        let payload: IndexPayload = serde_json::from_str(&format!(
            r#"{{"concept_id":"{concept}","folder_id":"{folder}"}}"#
        ))
        .unwrap();
        index.upsert_payload(unit(1.0, 0.0), payload).await.unwrap();

        let placement = index.placement(concept).await.unwrap().unwrap();
        assert_eq!(placement.primary_folder, Some(folder));
        assert_eq!(index.scroll_by_folder(folder).await.unwrap().len(), 1);
    }
}
