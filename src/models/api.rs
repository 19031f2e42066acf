use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::task::TaskRecord;

/// Request to submit a lecture video for processing.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[garde(length(min = 1, max = 300))]
    pub title: String,

    #[garde(length(min = 1, max = 2048))]
    pub video_url: String,

    #[garde(length(max = 4000))]
    #[serde(default)]
    pub description: Option<String>,
}

/// Response after a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: uuid::Uuid,
    pub task: TaskRecord,
    pub message: String,
}

/// Response after deleting a task.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: uuid::Uuid,
}
