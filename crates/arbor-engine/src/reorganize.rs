//! Out-of-band reorganization analysis.
//!
//! Periodically inspects a window of recent committed routing decisions.
//! When many concentrate on one folder while that folder's member vectors
//! show low coherence, proposes splitting it into subfolders. The output
//! is advisory only — it requires separate approval before any mutation —
//! and the analyzer never adds latency to per-candidate routing.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use arbor_core::{
    AuditLog, FolderRepository, NewFolderSpec, ReorganizationPlan, Result, RoutingAction,
    RoutingConfig, SuggestedAction, VectorIndex, Vector,
};
use arbor_search::{coherence, find_clusters};

/// Proposes advisory reorganization plans from decision history.
pub struct ReorganizationAnalyzer {
    audit: Arc<dyn AuditLog>,
    index: Arc<dyn VectorIndex>,
    folders: Arc<dyn FolderRepository>,
    config: RoutingConfig,
}

impl ReorganizationAnalyzer {
    pub fn new(
        audit: Arc<dyn AuditLog>,
        index: Arc<dyn VectorIndex>,
        folders: Arc<dyn FolderRepository>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            audit,
            index,
            folders,
            config,
        }
    }

    /// Analyze recent decisions and propose a plan, or None when the
    /// hierarchy looks healthy. Reads only committed history.
    pub async fn analyze(&self) -> Result<Option<ReorganizationPlan>> {
        let window = self.audit.recent(self.config.reorg_window).await?;
        if window.len() < self.config.reorg_min_decisions {
            debug!(
                window = window.len(),
                minimum = self.config.reorg_min_decisions,
                "too few decisions for reorganization analysis"
            );
            return Ok(None);
        }

        // Count route decisions per target folder.
        let mut per_folder: HashMap<Uuid, usize> = HashMap::new();
        let mut routed = 0usize;
        for decision in &window {
            if let RoutingAction::Route { folder_id } = &decision.action {
                *per_folder.entry(*folder_id).or_insert(0) += 1;
                routed += 1;
            }
        }
        if routed == 0 {
            return Ok(None);
        }

        let (&hot_folder, &hot_count) = per_folder
            .iter()
            .max_by_key(|(id, count)| (**count, std::cmp::Reverse(**id)))
            .expect("per_folder is non-empty when routed > 0");
        let concentration = hot_count as f32 / window.len() as f32;
        if concentration < self.config.reorg_concentration {
            debug!(
                folder_id = %hot_folder,
                concentration,
                "decision concentration below reorganization trigger"
            );
            return Ok(None);
        }

        self.propose_for_folder(hot_folder).await
    }

    /// Build a split proposal for one folder, or None when its members
    /// are coherent enough or no viable subclusters exist.
    pub async fn propose_for_folder(&self, folder_id: Uuid) -> Result<Option<ReorganizationPlan>> {
        let Some(folder) = self.folders.find(folder_id).await? else {
            return Ok(None);
        };

        let members = self.index.scroll_by_folder(folder_id).await?;
        if members.len() < self.config.clustering.minimum_cluster_size * 2 {
            return Ok(None);
        }

        let vectors: Vec<Vector> = members.iter().map(|(_, v)| v.clone()).collect();
        let current_coherence = coherence(&vectors);
        if current_coherence >= self.config.reorg_coherence_floor {
            debug!(
                folder_id = %folder_id,
                coherence = current_coherence,
                "folder coherent, no reorganization needed"
            );
            return Ok(None);
        }

        let clusters = find_clusters(&members, &self.config.clustering);
        let mut proposed = Vec::new();
        for (i, cluster) in clusters.iter().enumerate() {
            if cluster.suggested_action != SuggestedAction::CreateFolder || cluster.needs_split {
                continue;
            }
            // Subfolder paths beyond the depth bound are dropped rather
            // than proposed invalid.
            let Ok(path) = folder.path.child(&format!("group-{}", i + 1)) else {
                continue;
            };
            proposed.push(NewFolderSpec {
                path,
                member_ids: cluster.members.clone(),
                coherence: cluster.coherence,
            });
        }
        if proposed.is_empty() {
            return Ok(None);
        }

        let projected: f32 =
            proposed.iter().map(|s| s.coherence).sum::<f32>() / proposed.len() as f32;
        let improvement = (projected - current_coherence).max(0.0);

        info!(
            folder_id = %folder_id,
            subfolders = proposed.len(),
            coherence = current_coherence,
            improvement,
            "reorganization proposed"
        );

        Ok(Some(ReorganizationPlan {
            target_folder: folder_id,
            rationale: format!(
                "{} members with coherence {:.4} split into {} subfolders (projected {:.4})",
                members.len(),
                current_coherence,
                proposed.len(),
                projected
            ),
            proposed_subfolders: proposed,
            improvement,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{
        DecisionRationale, FolderPath, FolderRecord, Placement, RoutingDecision,
    };
    use arbor_index::{InMemoryAuditLog, InMemoryFolderRepository, InMemoryVectorIndex};

    fn unit3(x: f32, y: f32, z: f32) -> Vector {
        let norm = (x * x + y * y + z * z).sqrt();
        Vector::new(vec![x / norm, y / norm, z / norm])
    }

    struct Fixture {
        audit: Arc<InMemoryAuditLog>,
        index: Arc<InMemoryVectorIndex>,
        folders: Arc<InMemoryFolderRepository>,
        config: RoutingConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let mut config = RoutingConfig::default();
            config.reorg_min_decisions = 4;
            config.clustering.minimum_cluster_size = 2;
            Self {
                audit: Arc::new(InMemoryAuditLog::new()),
                index: Arc::new(InMemoryVectorIndex::new()),
                folders: Arc::new(InMemoryFolderRepository::new()),
                config,
            }
        }

        fn analyzer(&self) -> ReorganizationAnalyzer {
            ReorganizationAnalyzer::new(
                self.audit.clone(),
                self.index.clone(),
                self.folders.clone(),
                self.config.clone(),
            )
        }

        async fn route_decisions(&self, folder_id: Uuid, count: usize) {
            for _ in 0..count {
                let d = RoutingDecision::new(
                    Uuid::new_v4(),
                    RoutingAction::Route { folder_id },
                    0.9,
                    DecisionRationale::new("test"),
                );
                self.audit.append(&d).await.unwrap();
            }
        }

        async fn incoherent_folder(&self, member_groups: &[[f32; 3]], per_group: usize) -> Uuid {
            let record = FolderRecord::new(FolderPath::from_string("/mixed-topics").unwrap());
            let folder_id = record.id;
            self.folders.create(record).await.unwrap();
            for group in member_groups {
                for i in 0..per_group {
                    let concept = Uuid::new_v4();
                    let jitter = 0.01 * i as f32;
                    self.index
                        .upsert(
                            concept,
                            unit3(group[0] + jitter, group[1], group[2]),
                            Placement::primary(concept, folder_id, 0.9),
                        )
                        .await
                        .unwrap();
                }
            }
            folder_id
        }
    }

    #[tokio::test]
    async fn test_too_few_decisions_yields_none() {
        let fx = Fixture::new();
        fx.route_decisions(Uuid::new_v4(), 2).await;
        assert!(fx.analyzer().analyze().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dispersed_decisions_yield_none() {
        let fx = Fixture::new();
        for _ in 0..4 {
            fx.route_decisions(Uuid::new_v4(), 2).await;
        }
        assert!(fx.analyzer().analyze().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concentrated_incoherent_folder_proposes_split() {
        let fx = Fixture::new();
        // Two orthogonal member groups: low overall coherence
        let folder_id = fx
            .incoherent_folder(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], 3)
            .await;
        fx.route_decisions(folder_id, 10).await;

        let plan = fx.analyzer().analyze().await.unwrap().unwrap();
        assert_eq!(plan.target_folder, folder_id);
        assert_eq!(plan.proposed_subfolders.len(), 2);
        assert!(plan.improvement > 0.0);
        for spec in &plan.proposed_subfolders {
            assert!(spec.path.is_descendant_of(
                &FolderPath::from_string("/mixed-topics").unwrap()
            ));
            assert_eq!(spec.member_ids.len(), 3);
        }
    }

    #[tokio::test]
    async fn test_coherent_folder_yields_none() {
        let fx = Fixture::new();
        // One tight group: high coherence, nothing to split
        let folder_id = fx.incoherent_folder(&[[1.0, 0.0, 0.0]], 6).await;
        fx.route_decisions(folder_id, 10).await;

        assert!(fx.analyzer().analyze().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_small_folder_yields_none() {
        let fx = Fixture::new();
        let folder_id = fx
            .incoherent_folder(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], 1)
            .await;
        fx.route_decisions(folder_id, 10).await;

        assert!(fx.analyzer().analyze().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_analysis_is_read_only() {
        let fx = Fixture::new();
        let folder_id = fx
            .incoherent_folder(&[[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], 3)
            .await;
        fx.route_decisions(folder_id, 10).await;
        let folder_count_before = fx.folders.count().await.unwrap();

        let plan = fx.analyzer().analyze().await.unwrap();
        assert!(plan.is_some());
        // Advisory only: no folders created or mutated
        assert_eq!(fx.folders.count().await.unwrap(), folder_count_before);
        let folder = fx.folders.find(folder_id).await.unwrap().unwrap();
        assert_eq!(folder.version, 0);
    }

    #[tokio::test]
    async fn test_depth_bounded_proposals_dropped() {
        let fx = Fixture::new();
        // Folder already at maximum depth: children would exceed the bound
        let record = FolderRecord::new(FolderPath::from_string("/a/b/c/d").unwrap());
        let folder_id = record.id;
        fx.folders.create(record).await.unwrap();
        for group in [[1.0f32, 0.0, 0.0], [0.0, 0.0, 1.0]] {
            for i in 0..3 {
                let concept = Uuid::new_v4();
                fx.index
                    .upsert(
                        concept,
                        unit3(group[0] + 0.01 * i as f32, group[1], group[2]),
                        Placement::primary(concept, folder_id, 0.9),
                    )
                    .await
                    .unwrap();
            }
        }
        fx.route_decisions(folder_id, 10).await;

        // All candidate subfolder paths are invalid, so no plan emerges
        assert!(fx.analyzer().analyze().await.unwrap().is_none());
    }
}
