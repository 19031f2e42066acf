use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::models::task::{TaskRecord, TaskUpdate};
use crate::services::storage::{BlobStore, StorageError};

/// Object key for a task record.
pub fn task_key(task_id: Uuid) -> String {
    format!("tasks/{task_id}.json")
}

/// Object key for the transcript artifact.
pub fn transcript_key(task_id: Uuid) -> String {
    format!("transcriptions/{task_id}.txt")
}

/// Object key for the extracted audio artifact.
pub fn audio_key(task_id: Uuid) -> String {
    format!("audio/{task_id}.mp3")
}

/// Object key for the PDF notes artifact.
pub fn notes_key(task_id: Uuid) -> String {
    format!("notes/{task_id}.pdf")
}

/// Object key for the plain-text notes abstract.
pub fn abstract_key(task_id: Uuid) -> String {
    format!("notes/{task_id}.txt")
}

/// Persistence for [`TaskRecord`]s, one whole JSON object per task under
/// the `tasks/` namespace of the blob store.
///
/// `update` is read-modify-write, not compare-and-swap: two writers racing
/// on the same task id silently lose one of the writes. The queue's
/// visibility timeout is the only thing keeping concurrent attempts apart,
/// so a redelivered item plus a stale in-flight one can still interleave
/// here; the last writer wins.
#[derive(Clone)]
pub struct TaskStore {
    blobs: Arc<dyn BlobStore>,
}

impl TaskStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Persist a brand-new record. Callers must not reuse a task id; no
    /// dedup is performed here.
    pub async fn create(&self, record: &TaskRecord) -> Result<(), TaskStoreError> {
        self.put(record).await
    }

    pub async fn get(&self, task_id: Uuid) -> Result<TaskRecord, TaskStoreError> {
        let bytes = self
            .blobs
            .get(&task_key(task_id))
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => TaskStoreError::NotFound(task_id),
                other => TaskStoreError::Storage(other),
            })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Every known task id, parsed out of the `tasks/` listing.
    pub async fn list_ids(&self) -> Result<Vec<Uuid>, TaskStoreError> {
        let keys = self.blobs.list("tasks/").await?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                key.strip_prefix("tasks/")
                    .and_then(|rest| rest.strip_suffix(".json"))
                    .and_then(|id| id.parse().ok())
            })
            .collect())
    }

    /// Every record, keyed by task id. Unreadable entries are skipped with
    /// a warning rather than failing the whole scan.
    pub async fn list_all(&self) -> Result<HashMap<Uuid, TaskRecord>, TaskStoreError> {
        let mut tasks = HashMap::new();
        for task_id in self.list_ids().await? {
            match self.get(task_id).await {
                Ok(record) => {
                    tasks.insert(task_id, record);
                }
                Err(e) => {
                    tracing::warn!(task_id = %task_id, error = %e, "Skipping unreadable task record");
                }
            }
        }
        Ok(tasks)
    }

    /// Read-modify-write merge of the given fields; returns the merged
    /// record. Fails with `NotFound` if the record no longer exists.
    pub async fn update(
        &self,
        task_id: Uuid,
        update: TaskUpdate,
    ) -> Result<TaskRecord, TaskStoreError> {
        let mut record = self.get(task_id).await?;
        update.apply(&mut record);
        self.put(&record).await?;
        Ok(record)
    }

    /// Remove the record and, best-effort, its derived artifacts. Missing
    /// artifacts are not errors; a missing record is.
    pub async fn delete(&self, task_id: Uuid) -> Result<(), TaskStoreError> {
        // Existence check so deleting an unknown id reports NotFound.
        self.get(task_id).await?;

        self.blobs.delete(&task_key(task_id)).await?;

        for key in [
            transcript_key(task_id),
            audio_key(task_id),
            notes_key(task_id),
            abstract_key(task_id),
        ] {
            if let Err(e) = self.blobs.delete(&key).await {
                tracing::debug!(task_id = %task_id, key = %key, error = %e, "Artifact delete skipped");
            }
        }
        Ok(())
    }

    async fn put(&self, record: &TaskRecord) -> Result<(), TaskStoreError> {
        let body = serde_json::to_vec(record)?;
        self.blobs
            .put(&task_key(record.task_id), &body, "application/json")
            .await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    #[error("task not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("task record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
