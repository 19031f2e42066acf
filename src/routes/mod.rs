use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

pub mod health;
pub mod metrics;
pub mod tasks;

/// Structured API-boundary errors. Validation and not-found conditions are
/// recovered here into 4xx bodies; storage/queue failures surface as 500s.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    TaskNotFound {
        task_id: Uuid,
        /// Sample of known ids, returned for operator debuggability.
        available: Vec<Uuid>,
    },
    ArtifactUnavailable {
        task_id: Uuid,
        artifact: &'static str,
    },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            ApiError::TaskNotFound { task_id, available } => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "Task not found",
                    "task_id": task_id,
                    "available_tasks": available,
                })),
            )
                .into_response(),
            ApiError::ArtifactUnavailable { task_id, artifact } => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": format!("Task has no {artifact} yet"),
                    "task_id": task_id,
                })),
            )
                .into_response(),
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}
