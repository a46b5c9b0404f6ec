//! Per-folder aggregate updates under single-writer discipline.
//!
//! Concurrent placements into the same folder serialize through a
//! per-folder async mutex, so centroid/exemplar/member-count updates are
//! never lost. Readers may observe slightly stale centroids between
//! updates. Version conflicts from other writers (e.g. a rename) reload
//! and retry, bounded by the retry config.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use arbor_core::{
    defaults, Error, ErrorKind, FolderRepository, Result, RetryConfig, Vector,
};

/// Serializes folder aggregate mutations per folder id.
pub struct FolderAggregateWriter {
    folders: Arc<dyn FolderRepository>,
    retry: RetryConfig,
    max_exemplars: usize,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl FolderAggregateWriter {
    pub fn new(folders: Arc<dyn FolderRepository>, retry: RetryConfig) -> Self {
        Self {
            folders,
            retry,
            max_exemplars: defaults::MAX_EXEMPLARS,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_exemplars(mut self, max: usize) -> Self {
        self.max_exemplars = max;
        self
    }

    async fn lock_for(&self, folder_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(folder_id).or_default().clone()
    }

    /// Fold a newly placed member vector into the folder aggregate.
    pub async fn apply_placement(&self, folder_id: Uuid, vector: &Vector) -> Result<()> {
        let lock = self.lock_for(folder_id).await;
        let _guard = lock.lock().await;

        for attempt in 0..self.retry.max_attempts {
            let mut record = self
                .folders
                .find(folder_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("folder {folder_id}")))?;

            let n = record.member_count as f32;
            record.centroid = if record.centroid.is_empty() || record.member_count == 0 {
                vector.clone()
            } else {
                let merged: Vec<f32> = record
                    .centroid
                    .as_slice()
                    .iter()
                    .zip(vector.as_slice())
                    .map(|(c, v)| (c * n + v) / (n + 1.0))
                    .collect();
                Vector::new(merged)
            };
            record.member_count += 1;
            record.exemplars.push(vector.clone());
            if record.exemplars.len() > self.max_exemplars {
                let overflow = record.exemplars.len() - self.max_exemplars;
                record.exemplars.drain(..overflow);
            }

            match self.folders.update(record).await {
                Ok(()) => {
                    debug!(folder_id = %folder_id, "folder aggregate updated");
                    return Ok(());
                }
                // Another writer (rename, reorg commit) bumped the version
                // between our read and write: reload and retry.
                Err(e) if e.kind() == ErrorKind::Concurrency => {
                    warn!(
                        folder_id = %folder_id,
                        retry_attempt = attempt + 1,
                        "folder version conflict, reloading"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::concurrency(format!(
            "folder {folder_id} update conflicted {} times",
            self.retry.max_attempts
        ))
        .with_context("folder_id", folder_id))
    }

    /// Remove a member vector from the folder aggregate.
    pub async fn apply_removal(&self, folder_id: Uuid, vector: &Vector) -> Result<()> {
        let lock = self.lock_for(folder_id).await;
        let _guard = lock.lock().await;

        for _ in 0..self.retry.max_attempts {
            let mut record = self
                .folders
                .find(folder_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("folder {folder_id}")))?;

            if record.member_count <= 1 {
                record.member_count = 0;
                record.centroid = Vector::new(Vec::new());
                record.exemplars.clear();
            } else {
                let n = record.member_count as f32;
                let reduced: Vec<f32> = record
                    .centroid
                    .as_slice()
                    .iter()
                    .zip(vector.as_slice())
                    .map(|(c, v)| (c * n - v) / (n - 1.0))
                    .collect();
                record.centroid = Vector::new(reduced);
                record.member_count -= 1;
                record.exemplars.retain(|e| e != vector);
            }

            match self.folders.update(record).await {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Concurrency => continue,
                Err(e) => return Err(e),
            }
        }
        Err(Error::concurrency(format!(
            "folder {folder_id} removal conflicted {} times",
            self.retry.max_attempts
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::{FolderPath, FolderRecord};
    use arbor_index::InMemoryFolderRepository;

    async fn fixture() -> (Arc<InMemoryFolderRepository>, Uuid) {
        let folders = Arc::new(InMemoryFolderRepository::new());
        let record = FolderRecord::new(FolderPath::from_string("/algorithms").unwrap());
        let id = record.id;
        folders.create(record).await.unwrap();
        (folders, id)
    }

    #[tokio::test]
    async fn test_first_placement_sets_centroid() {
        let (folders, id) = fixture().await;
        let writer = FolderAggregateWriter::new(folders.clone(), RetryConfig::default());

        writer
            .apply_placement(id, &Vector::new(vec![1.0, 0.0]))
            .await
            .unwrap();

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 1);
        assert_eq!(record.centroid.as_slice(), &[1.0, 0.0]);
        assert_eq!(record.exemplars.len(), 1);
    }

    #[tokio::test]
    async fn test_centroid_is_running_mean() {
        let (folders, id) = fixture().await;
        let writer = FolderAggregateWriter::new(folders.clone(), RetryConfig::default());

        writer
            .apply_placement(id, &Vector::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        writer
            .apply_placement(id, &Vector::new(vec![0.0, 1.0]))
            .await
            .unwrap();

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 2);
        assert_eq!(record.centroid.as_slice(), &[0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_exemplars_capped() {
        let (folders, id) = fixture().await;
        let writer =
            FolderAggregateWriter::new(folders.clone(), RetryConfig::default()).with_max_exemplars(2);

        for i in 0..4 {
            writer
                .apply_placement(id, &Vector::new(vec![i as f32, 1.0]))
                .await
                .unwrap();
        }

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 4);
        assert_eq!(record.exemplars.len(), 2);
        // Oldest exemplars dropped first
        assert_eq!(record.exemplars[0].as_slice(), &[2.0, 1.0]);
        assert_eq!(record.exemplars[1].as_slice(), &[3.0, 1.0]);
    }

    #[tokio::test]
    async fn test_concurrent_placements_not_lost() {
        let (folders, id) = fixture().await;
        let writer = Arc::new(FolderAggregateWriter::new(
            folders.clone(),
            RetryConfig::default(),
        ));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                writer
                    .apply_placement(id, &Vector::new(vec![1.0, 1.0]))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 16);
    }

    #[tokio::test]
    async fn test_removal_reverses_placement() {
        let (folders, id) = fixture().await;
        let writer = FolderAggregateWriter::new(folders.clone(), RetryConfig::default());

        writer
            .apply_placement(id, &Vector::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        writer
            .apply_placement(id, &Vector::new(vec![0.0, 1.0]))
            .await
            .unwrap();
        writer
            .apply_removal(id, &Vector::new(vec![0.0, 1.0]))
            .await
            .unwrap();

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 1);
        let centroid = record.centroid.as_slice();
        assert!((centroid[0] - 1.0).abs() < 1e-6);
        assert!(centroid[1].abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_removal_of_last_member_resets() {
        let (folders, id) = fixture().await;
        let writer = FolderAggregateWriter::new(folders.clone(), RetryConfig::default());

        writer
            .apply_placement(id, &Vector::new(vec![1.0, 0.0]))
            .await
            .unwrap();
        writer
            .apply_removal(id, &Vector::new(vec![1.0, 0.0]))
            .await
            .unwrap();

        let record = folders.find(id).await.unwrap().unwrap();
        assert_eq!(record.member_count, 0);
        assert!(record.centroid.is_empty());
        assert!(record.exemplars.is_empty());
    }

    #[tokio::test]
    async fn test_missing_folder_is_not_found() {
        let folders = Arc::new(InMemoryFolderRepository::new());
        let writer = FolderAggregateWriter::new(folders, RetryConfig::default());
        let err = writer
            .apply_placement(Uuid::new_v4(), &Vector::new(vec![1.0]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
