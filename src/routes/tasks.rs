use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{DeleteResponse, SubmitRequest, SubmitResponse};
use crate::models::task::TaskRecord;
use crate::routes::ApiError;
use crate::services::submission::{self, SubmitError};
use crate::services::task_store::TaskStoreError;

const KNOWN_ID_SAMPLE: usize = 5;

/// POST /api/submit — validate a lecture link, create its task record and
/// enqueue it for processing.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let record = submission::submit(
        &state.tasks,
        state.queue.as_ref(),
        state.link_validator.as_deref(),
        request,
    )
    .await
    .map_err(|e| match e {
        SubmitError::Validation(message) => ApiError::Validation(message),
        SubmitError::Enqueue { .. } => {
            ApiError::Internal("Task saved but failed to queue for processing".to_string())
        }
        SubmitError::Storage(e) => ApiError::Internal(format!("Failed to save task: {e}")),
    })?;

    Ok(Json(SubmitResponse {
        task_id: record.task_id,
        message: "Lecture added to queue successfully".to_string(),
        task: record,
    }))
}

/// GET /api/tasks — every task record keyed by id, for the polling UI.
pub async fn get_all_tasks(
    State(state): State<AppState>,
) -> Result<Json<HashMap<Uuid, TaskRecord>>, ApiError> {
    let tasks = state
        .tasks
        .list_all()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(tasks))
}

/// GET /api/status/{task_id} — full task record for one task.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskRecord>, ApiError> {
    let record = fetch_task(&state, task_id).await?;
    Ok(Json(record))
}

/// DELETE /api/tasks/{task_id} — remove the record and its artifacts.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<DeleteResponse>, ApiError> {
    match state.tasks.delete(task_id).await {
        Ok(()) => {
            tracing::info!(task_id = %task_id, "Task deleted");
            Ok(Json(DeleteResponse { deleted: task_id }))
        }
        Err(TaskStoreError::NotFound(_)) => Err(not_found(&state, task_id).await),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// GET /download/{task_id}/transcript — transcript text as an attachment.
pub async fn download_transcript(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let record = fetch_task(&state, task_id).await?;
    let Some(transcription) = record.transcription else {
        return Err(ApiError::ArtifactUnavailable {
            task_id,
            artifact: "transcript",
        });
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"transcription_{task_id}.txt\""),
            ),
        ],
        transcription,
    )
        .into_response())
}

/// GET /download/{task_id}/audio — redirect to the stored audio track.
pub async fn download_audio(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let record = fetch_task(&state, task_id).await?;
    record
        .audio_url
        .map(|url| Redirect::to(&url))
        .ok_or(ApiError::ArtifactUnavailable {
            task_id,
            artifact: "audio track",
        })
}

/// GET /download/{task_id}/notes — redirect to the stored PDF notes.
pub async fn download_notes(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let record = fetch_task(&state, task_id).await?;
    record
        .notes_url
        .map(|url| Redirect::to(&url))
        .ok_or(ApiError::ArtifactUnavailable {
            task_id,
            artifact: "notes document",
        })
}

async fn fetch_task(state: &AppState, task_id: Uuid) -> Result<TaskRecord, ApiError> {
    match state.tasks.get(task_id).await {
        Ok(record) => Ok(record),
        Err(TaskStoreError::NotFound(_)) => Err(not_found(state, task_id).await),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

async fn not_found(state: &AppState, task_id: Uuid) -> ApiError {
    let mut available = state.tasks.list_ids().await.unwrap_or_default();
    available.truncate(KNOWN_ID_SAMPLE);
    ApiError::TaskNotFound { task_id, available }
}
