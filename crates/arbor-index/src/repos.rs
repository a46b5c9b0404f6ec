//! In-memory collaborator implementations: artifact and folder
//! repositories, audit log, and review queue.
//!
//! These back tests and single-process deployments; durable adapters
//! implement the same traits.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use arbor_core::{
    AlternativeFolder, Artifact, ArtifactRepository, AuditLog, Error, FolderPath, FolderRecord,
    FolderRepository, Result, ReviewQueue, ReviewReason, RoutingDecision,
};

// =============================================================================
// ARTIFACTS
// =============================================================================

/// In-memory [`ArtifactRepository`].
#[derive(Default)]
pub struct InMemoryArtifactRepository {
    artifacts: RwLock<HashMap<Uuid, Artifact>>,
}

impl InMemoryArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn save(&self, artifact: Artifact) -> Result<()> {
        self.artifacts.write().await.insert(artifact.id, artifact);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Artifact>> {
        Ok(self.artifacts.read().await.get(&id).cloned())
    }

    async fn update_routing(&self, id: Uuid, decision_id: Uuid) -> Result<()> {
        let mut artifacts = self.artifacts.write().await;
        let artifact = artifacts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("artifact {id}")))?;
        artifact.decision_id = Some(decision_id);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.artifacts.write().await.remove(&id);
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.artifacts.read().await.len())
    }

    async fn created_at(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        Ok(self.artifacts.read().await.get(&id).map(|a| a.created_at))
    }
}

// =============================================================================
// FOLDERS
// =============================================================================

/// In-memory [`FolderRepository`] with optimistic versioning.
#[derive(Default)]
pub struct InMemoryFolderRepository {
    folders: RwLock<HashMap<Uuid, FolderRecord>>,
}

impl InMemoryFolderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FolderRepository for InMemoryFolderRepository {
    async fn create(&self, record: FolderRecord) -> Result<Uuid> {
        let mut folders = self.folders.write().await;
        if folders.values().any(|f| f.path == record.path) {
            return Err(Error::validation(format!(
                "folder already exists at {}",
                record.path
            ))
            .with_context("path", &record.path));
        }
        let id = record.id;
        folders.insert(id, record);
        Ok(id)
    }

    async fn find(&self, id: Uuid) -> Result<Option<FolderRecord>> {
        Ok(self.folders.read().await.get(&id).cloned())
    }

    async fn find_by_path(&self, path: &FolderPath) -> Result<Option<FolderRecord>> {
        Ok(self
            .folders
            .read()
            .await
            .values()
            .find(|f| &f.path == path)
            .cloned())
    }

    async fn update(&self, mut record: FolderRecord) -> Result<()> {
        let mut folders = self.folders.write().await;
        let stored = folders
            .get(&record.id)
            .ok_or_else(|| Error::not_found(format!("folder {}", record.id)))?;
        if stored.version != record.version {
            return Err(Error::concurrency(format!(
                "folder {} version conflict: stored {}, update carries {}",
                record.id, stored.version, record.version
            ))
            .with_context("folder_id", record.id)
            .with_context("stored_version", stored.version));
        }
        record.version += 1;
        record.updated_at = Utc::now();
        folders.insert(record.id, record);
        Ok(())
    }

    async fn rename(&self, id: Uuid, new_path: FolderPath) -> Result<()> {
        let mut folders = self.folders.write().await;
        if folders.values().any(|f| f.id != id && f.path == new_path) {
            return Err(Error::validation(format!(
                "folder already exists at {new_path}"
            )));
        }
        let folder = folders
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("folder {id}")))?;
        folder.path = new_path;
        folder.version += 1;
        folder.updated_at = Utc::now();
        Ok(())
    }

    async fn list_children(&self, path: &FolderPath) -> Result<Vec<FolderRecord>> {
        let folders = self.folders.read().await;
        let mut children: Vec<FolderRecord> = folders
            .values()
            .filter(|f| f.path.parent().as_ref() == Some(path))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(children)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.folders.read().await.len())
    }
}

// =============================================================================
// AUDIT LOG
// =============================================================================

/// In-memory append-only [`AuditLog`].
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<RoutingDecision>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, decision: &RoutingDecision) -> Result<()> {
        self.entries.write().await.push(decision.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<RoutingDecision>> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }
}

// =============================================================================
// REVIEW QUEUE
// =============================================================================

/// One queued review item.
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub candidate_id: Uuid,
    pub reason: ReviewReason,
    pub suggested: Vec<AlternativeFolder>,
    pub queued_at: DateTime<Utc>,
}

/// In-memory [`ReviewQueue`] with inspection support for tests.
#[derive(Default)]
pub struct InMemoryReviewQueue {
    items: RwLock<Vec<ReviewItem>>,
}

impl InMemoryReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn pending(&self) -> Vec<ReviewItem> {
        self.items.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl ReviewQueue for InMemoryReviewQueue {
    async fn add_for_review(
        &self,
        candidate_id: Uuid,
        reason: ReviewReason,
        suggested: Vec<AlternativeFolder>,
    ) -> Result<()> {
        self.items.write().await.push(ReviewItem {
            candidate_id,
            reason,
            suggested,
            queued_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{ErrorKind, Vector};

    fn folder_at(path: &str) -> FolderRecord {
        FolderRecord::new(FolderPath::from_string(path).unwrap())
    }

    #[tokio::test]
    async fn test_artifact_lifecycle() {
        let repo = InMemoryArtifactRepository::new();
        let artifact = Artifact {
            id: Uuid::new_v4(),
            title: "Heap sort".into(),
            content_hash: "abc".into(),
            created_at: Utc::now(),
            decision_id: None,
        };
        let id = artifact.id;

        repo.save(artifact).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.created_at(id).await.unwrap().is_some());

        let decision = Uuid::new_v4();
        repo.update_routing(id, decision).await.unwrap();
        assert_eq!(repo.find(id).await.unwrap().unwrap().decision_id, Some(decision));

        repo.delete(id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_routing_missing_artifact() {
        let repo = InMemoryArtifactRepository::new();
        let err = repo
            .update_routing(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_folder_version_conflict() {
        let repo = InMemoryFolderRepository::new();
        let record = folder_at("/algorithms");
        let id = repo.create(record.clone()).await.unwrap();

        // First writer wins
        let mut fresh = repo.find(id).await.unwrap().unwrap();
        fresh.member_count = 1;
        repo.update(fresh).await.unwrap();

        // Second writer still holds version 0
        let mut stale = record;
        stale.member_count = 2;
        let err = repo.update(stale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);

        // Reload-and-retry succeeds
        let mut reloaded = repo.find(id).await.unwrap().unwrap();
        reloaded.member_count = 2;
        repo.update(reloaded).await.unwrap();
        assert_eq!(repo.find(id).await.unwrap().unwrap().member_count, 2);
    }

    #[tokio::test]
    async fn test_folder_duplicate_path_rejected() {
        let repo = InMemoryFolderRepository::new();
        repo.create(folder_at("/algorithms")).await.unwrap();
        let err = repo.create(folder_at("/algorithms")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_folder_find_by_path_and_children() {
        let repo = InMemoryFolderRepository::new();
        repo.create(folder_at("/algorithms")).await.unwrap();
        repo.create(folder_at("/algorithms/sorting")).await.unwrap();
        repo.create(folder_at("/algorithms/graphs")).await.unwrap();
        repo.create(folder_at("/data-structures")).await.unwrap();

        let parent = FolderPath::from_string("/algorithms").unwrap();
        assert!(repo.find_by_path(&parent).await.unwrap().is_some());

        let children = repo.list_children(&parent).await.unwrap();
        let paths: Vec<String> = children.iter().map(|c| c.path.to_string()).collect();
        assert_eq!(paths, vec!["/algorithms/graphs", "/algorithms/sorting"]);

        let roots = repo.list_children(&FolderPath::root()).await.unwrap();
        assert_eq!(roots.len(), 2);
    }

    #[tokio::test]
    async fn test_folder_rename_bumps_version() {
        let repo = InMemoryFolderRepository::new();
        let id = repo.create(folder_at("/old-name")).await.unwrap();
        repo.rename(id, FolderPath::from_string("/new-name").unwrap())
            .await
            .unwrap();

        let folder = repo.find(id).await.unwrap().unwrap();
        assert_eq!(folder.path.to_string(), "/new-name");
        assert_eq!(folder.version, 1);
    }

    #[tokio::test]
    async fn test_audit_log_recent_newest_first() {
        use arbor_core::{DecisionRationale, RoutingAction, RoutingDecision};

        let log = InMemoryAuditLog::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let d = RoutingDecision::new(
                Uuid::new_v4(),
                RoutingAction::Unsorted,
                0.0,
                DecisionRationale::new("test"),
            );
            ids.push(d.id);
            log.append(&d).await.unwrap();
        }

        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[2]);
        assert_eq!(recent[1].id, ids[1]);
    }

    #[tokio::test]
    async fn test_review_queue_records_items() {
        let queue = InMemoryReviewQueue::new();
        let candidate = Uuid::new_v4();
        queue
            .add_for_review(
                candidate,
                ReviewReason::AmbiguousRouting,
                vec![AlternativeFolder {
                    folder_id: Uuid::new_v4(),
                    path: FolderPath::from_string("/algorithms").unwrap(),
                    score: 0.7,
                }],
            )
            .await
            .unwrap();

        let pending = queue.pending().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].candidate_id, candidate);
        assert_eq!(pending[0].reason, ReviewReason::AmbiguousRouting);
        assert_eq!(pending[0].suggested.len(), 1);
    }

    #[tokio::test]
    async fn test_folder_record_new_is_empty() {
        let record = folder_at("/fresh");
        assert_eq!(record.member_count, 0);
        assert_eq!(record.version, 0);
        assert_eq!(record.centroid, Vector::new(Vec::new()));
    }
}
