//! Cross-folder discovery for read-time enrichment.
//!
//! Finds concepts in other folders related to a folder's local concepts
//! and tags each with a relationship-type heuristic. Read-only: discovery
//! never mutates placement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use arbor_core::{
    DiscoveredConcept, DiscoveryConfig, FolderRecord, FolderRepository, RelationshipKind,
    Result, SearchFilter, Vector, VectorIndex,
};

use crate::clustering::centroid;

/// Same-depth hits at or above this similarity are Parallel.
const PARALLEL_SIMILARITY: f32 = arbor_core::defaults::PARALLEL_SIMILARITY;

/// Label attached to discoveries made through centroid search.
const METHOD_CENTROID: &str = "centroid-similarity";

/// Assign a relationship from the depth relation between the source and
/// target folders and the similarity band.
///
/// Shallower targets read as prerequisites (more general material),
/// deeper targets as advanced follow-ups. Same-depth hits split by
/// similarity: strong ones run parallel, weaker ones are applications
/// when the target is provisional, otherwise loosely related.
fn classify_relationship(
    source: &FolderRecord,
    target: &FolderRecord,
    similarity: f32,
) -> RelationshipKind {
    let source_depth = source.path.depth();
    let target_depth = target.path.depth();
    if target_depth < source_depth {
        RelationshipKind::Prerequisite
    } else if target_depth > source_depth {
        RelationshipKind::Advanced
    } else if similarity >= PARALLEL_SIMILARITY {
        RelationshipKind::Parallel
    } else if target.path.is_provisional() {
        RelationshipKind::Application
    } else {
        RelationshipKind::Related
    }
}

/// Finds related concepts across folders, with a per-folder result cache.
pub struct DiscoveryService {
    index: Arc<dyn VectorIndex>,
    folders: Arc<dyn FolderRepository>,
    config: DiscoveryConfig,
    cache: RwLock<HashMap<Uuid, Vec<DiscoveredConcept>>>,
}

impl DiscoveryService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        folders: Arc<dyn FolderRepository>,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            index,
            folders,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Discover concepts in other folders related to this folder's local
    /// concepts. Results are cached per folder until invalidated.
    pub async fn discover_related(
        &self,
        folder: &FolderRecord,
        local_vectors: &[Vector],
    ) -> Result<Vec<DiscoveredConcept>> {
        if let Some(cached) = self.cache.read().await.get(&folder.id) {
            return Ok(cached.clone());
        }

        if local_vectors.is_empty() {
            return Ok(Vec::new());
        }
        let query = centroid(local_vectors)?;

        let filter = SearchFilter::excluding_folder(folder.id);
        let hits = self
            .index
            .search(
                &query,
                self.config.relevance_threshold,
                self.config.limit,
                Some(&filter),
            )
            .await?;

        let mut discovered = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(target_id) = hit.folder_id else {
                continue;
            };
            let Some(target) = self.folders.find(target_id).await? else {
                continue;
            };
            discovered.push(DiscoveredConcept {
                concept_id: hit.concept_id,
                folder_id: target_id,
                similarity: hit.score,
                relationship: classify_relationship(folder, &target, hit.score),
                discovery_method: METHOD_CENTROID.to_string(),
            });
        }

        debug!(
            folder_id = %folder.id,
            result_count = discovered.len(),
            "discovery complete"
        );

        self.cache
            .write()
            .await
            .insert(folder.id, discovered.clone());
        Ok(discovered)
    }

    /// Drop the cached results for one folder.
    pub async fn invalidate(&self, folder_id: Uuid) {
        self.cache.write().await.remove(&folder_id);
    }

    /// Drop all cached results.
    pub async fn invalidate_all(&self) {
        self.cache.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{FolderPath, Placement};
    use arbor_index::{InMemoryFolderRepository, InMemoryVectorIndex};

    fn unit(x: f32, y: f32) -> Vector {
        let norm = (x * x + y * y).sqrt();
        Vector::new(vec![x / norm, y / norm])
    }

    async fn make_folder(repo: &InMemoryFolderRepository, path: &str) -> FolderRecord {
        let record = FolderRecord::new(FolderPath::from_string(path).unwrap());
        repo.create(record.clone()).await.unwrap();
        record
    }

    async fn place_concept(index: &InMemoryVectorIndex, folder: Uuid, vector: Vector) -> Uuid {
        let concept = Uuid::new_v4();
        index
            .upsert(concept, vector, Placement::primary(concept, folder, 0.9))
            .await
            .unwrap();
        concept
    }

    fn fixture() -> (
        Arc<InMemoryVectorIndex>,
        Arc<InMemoryFolderRepository>,
    ) {
        (
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(InMemoryFolderRepository::new()),
        )
    }

    #[tokio::test]
    async fn test_discovery_excludes_source_folder() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;
        let other = make_folder(&folders, "/algorithms/graphs").await;

        place_concept(&index, source.id, unit(1.0, 0.0)).await;
        let foreign = place_concept(&index, other.id, unit(1.0, 0.05)).await;

        let svc = DiscoveryService::new(index, folders, DiscoveryConfig::default());
        let found = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].concept_id, foreign);
        assert_eq!(found[0].folder_id, other.id);
        assert_eq!(found[0].discovery_method, "centroid-similarity");
    }

    #[tokio::test]
    async fn test_relationship_depth_heuristic() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;
        let shallower = make_folder(&folders, "/mathematics").await;
        let deeper = make_folder(&folders, "/algorithms/graphs/shortest-paths").await;

        place_concept(&index, shallower.id, unit(1.0, 0.02)).await;
        place_concept(&index, deeper.id, unit(1.0, 0.04)).await;

        let svc = DiscoveryService::new(index, folders, DiscoveryConfig::default());
        let found = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();

        let by_folder: HashMap<Uuid, RelationshipKind> = found
            .iter()
            .map(|d| (d.folder_id, d.relationship))
            .collect();
        assert_eq!(by_folder[&shallower.id], RelationshipKind::Prerequisite);
        assert_eq!(by_folder[&deeper.id], RelationshipKind::Advanced);
    }

    #[tokio::test]
    async fn test_same_depth_strong_similarity_is_parallel() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;
        let sibling = make_folder(&folders, "/algorithms/searching").await;

        place_concept(&index, sibling.id, unit(1.0, 0.01)).await;

        let svc = DiscoveryService::new(index, folders, DiscoveryConfig::default());
        let found = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].relationship, RelationshipKind::Parallel);
    }

    #[tokio::test]
    async fn test_below_relevance_threshold_not_discovered() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;
        let other = make_folder(&folders, "/cooking").await;

        place_concept(&index, other.id, unit(0.0, 1.0)).await;

        let svc = DiscoveryService::new(index, folders, DiscoveryConfig::default());
        let found = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_cache_and_invalidation() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;
        let other = make_folder(&folders, "/algorithms/graphs").await;

        let svc = DiscoveryService::new(index.clone(), folders, DiscoveryConfig::default());
        let first = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();
        assert!(first.is_empty());

        // New concept appears after the first (cached) discovery
        place_concept(&index, other.id, unit(1.0, 0.02)).await;
        let cached = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();
        assert!(cached.is_empty(), "stale cache expected");

        svc.invalidate(source.id).await;
        let fresh = svc
            .discover_related(&source, &[unit(1.0, 0.0)])
            .await
            .unwrap();
        assert_eq!(fresh.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_local_vectors_yields_nothing() {
        let (index, folders) = fixture();
        let source = make_folder(&folders, "/algorithms/sorting").await;

        let svc = DiscoveryService::new(index, folders, DiscoveryConfig::default());
        let found = svc.discover_related(&source, &[]).await.unwrap();
        assert!(found.is_empty());
    }
}
