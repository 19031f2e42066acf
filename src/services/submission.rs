use garde::Validate;
use uuid::Uuid;

use crate::models::api::SubmitRequest;
use crate::models::task::TaskRecord;
use crate::services::link_check::LinkValidator;
use crate::services::queue::{QueueError, WorkItem, WorkQueue};
use crate::services::task_store::{TaskStore, TaskStoreError};

/// Validate a submission, persist its task record, then enqueue the work
/// item. The producer side of the pipeline.
///
/// Ordering matters: the record is created before the enqueue so a polling
/// client can always see the task it submitted. If the enqueue then fails,
/// the record is intentionally left behind in `processing` (a stuck task,
/// detectable by a stale `updated_at`) instead of failing the request with
/// nothing to show for it.
pub async fn submit(
    store: &TaskStore,
    queue: &dyn WorkQueue,
    link_validator: Option<&LinkValidator>,
    request: SubmitRequest,
) -> Result<TaskRecord, SubmitError> {
    if let Err(report) = request.validate() {
        return Err(SubmitError::Validation(report.to_string()));
    }

    let title = request.title.trim().to_string();
    let video_url = request.video_url.trim().to_string();
    let description = request
        .description
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();

    if title.is_empty() || video_url.is_empty() {
        return Err(SubmitError::Validation(
            "Please provide both title and video URL".to_string(),
        ));
    }

    if let Some(validator) = link_validator {
        validator
            .validate(&video_url)
            .await
            .map_err(|e| SubmitError::Validation(e.to_string()))?;
    }

    let record = TaskRecord::new(title, video_url, description);
    store.create(&record).await?;

    if let Err(e) = queue.enqueue(&WorkItem::from(&record)).await {
        tracing::error!(task_id = %record.task_id, error = %e, "Task saved but enqueue failed");
        return Err(SubmitError::Enqueue {
            task_id: record.task_id,
            source: e,
        });
    }

    metrics::counter!("lecture_tasks_submitted").increment(1);
    tracing::info!(task_id = %record.task_id, title = %record.title, "Task submitted and queued");
    Ok(record)
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),

    #[error("failed to save task: {0}")]
    Storage(#[from] TaskStoreError),

    #[error("task {task_id} saved but failed to queue for processing: {source}")]
    Enqueue {
        task_id: Uuid,
        source: QueueError,
    },
}
