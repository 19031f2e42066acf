use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Status of a lecture-notes task in the async pipeline.
///
/// Transitions only move forward within a processing attempt:
/// `Queued` -> `Processing` -> `Completed` | `Failed`. A queue redelivery
/// starts a fresh attempt and may flip a `Failed` record back to
/// `Processing`; nothing ever re-enters `Queued`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Durable record describing one submitted lecture and its progress.
///
/// The single source of truth for a task, stored as a whole JSON object
/// under `tasks/{task_id}.json`. `task_id`, `title`, `video_url`,
/// `description` and `created_at` are written once at submission; the
/// worker pipeline owns every later mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: Uuid,
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    /// Percentage in 0..=100, non-decreasing within one processing attempt.
    pub progress: u8,
    #[serde(default)]
    pub status_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    // Stage artifacts, populated as the pipeline advances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_url: Option<String>,
    /// Source video length in seconds; best-effort enrichment, may be absent
    /// even on completed tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Build the initial record for a fresh submission.
    pub fn new(title: String, video_url: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::new_v4(),
            title,
            video_url,
            description,
            status: TaskStatus::Processing,
            progress: 10,
            status_message: "Queued for processing".to_string(),
            created_at: now,
            updated_at: now,
            error_message: None,
            transcription: None,
            transcript_url: None,
            audio_url: None,
            notes_url: None,
            video_duration: None,
            processed_at: None,
        }
    }
}

/// Partial-field mutation applied to a [`TaskRecord`] by
/// `TaskStore::update`. Absent fields leave the record untouched;
/// `updated_at` is stamped by the store on every merge.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
    pub transcription: Option<String>,
    pub transcript_url: Option<String>,
    pub audio_url: Option<String>,
    pub notes_url: Option<String>,
    pub video_duration: Option<f64>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl TaskUpdate {
    /// Progress/status_message checkpoint written between pipeline stages.
    pub fn checkpoint(progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Processing),
            progress: Some(progress),
            status_message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Terminal failure with a human-readable cause.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: Some(TaskStatus::Failed),
            progress: Some(0),
            status_message: Some("Processing failed".to_string()),
            error_message: Some(message),
            ..Default::default()
        }
    }

    pub fn apply(self, record: &mut TaskRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress.min(100);
        }
        if let Some(message) = self.status_message {
            record.status_message = message;
        }
        if let Some(error) = self.error_message {
            record.error_message = Some(error);
        }
        if let Some(text) = self.transcription {
            record.transcription = Some(text);
        }
        if let Some(url) = self.transcript_url {
            record.transcript_url = Some(url);
        }
        if let Some(url) = self.audio_url {
            record.audio_url = Some(url);
        }
        if let Some(url) = self.notes_url {
            record.notes_url = Some(url);
        }
        if let Some(duration) = self.video_duration {
            record.video_duration = Some(duration);
        }
        if let Some(at) = self.processed_at {
            record.processed_at = Some(at);
        }
        record.updated_at = Utc::now();
    }
}
