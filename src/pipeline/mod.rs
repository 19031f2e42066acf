//! The worker pipeline: consumes work items and advances task records
//! through the ordered processing stages, checkpointing progress into the
//! task store after every stage.
//!
//! Delivery protocol: an item that completes all stages is acknowledged
//! (deleted from the queue); any failure leaves the delivery
//! unacknowledged so the queue redelivers it after the visibility window.
//! Processing is therefore re-runnable against the same task id: every
//! artifact write is a whole-object replace on a fixed key, and a rerun
//! overwrites rather than duplicates. A rerun may also flip a `failed`
//! record back to `processing`; that is the accepted cost of at-least-once
//! delivery with no per-task locking.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::models::task::{TaskStatus, TaskUpdate};
use crate::services::fetch::VideoFetcher;
use crate::services::media::AudioExtractor;
use crate::services::notes;
use crate::services::pdf;
use crate::services::queue::{Delivery, QueueError, WorkItem, WorkQueue};
use crate::services::storage::BlobStore;
use crate::services::summarize::Summarizer;
use crate::services::task_store::{
    abstract_key, audio_key, notes_key, transcript_key, TaskStore,
};
use crate::services::transcribe::Transcriber;

/// A pipeline stage's terminal error. The orchestrator inspects these
/// rather than letting stage internals decide retry policy; the message is
/// stored verbatim as the task's `error_message`.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    #[error("Video download failed: {0}")]
    Acquire(String),

    #[error("Audio extraction failed: {0}")]
    Transcode(String),

    #[error("Transcription failed: {0}")]
    Transcribe(String),

    #[error("Notes rendering failed: {0}")]
    Render(String),

    #[error("Failed to persist results: {0}")]
    Persist(String),
}

/// Orchestrates one work item at a time through
/// acquire -> transcode -> transcribe -> synthesize -> render & persist.
pub struct Pipeline {
    store: TaskStore,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn WorkQueue>,
    fetcher: Arc<dyn VideoFetcher>,
    extractor: Arc<dyn AudioExtractor>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: TaskStore,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn WorkQueue>,
        fetcher: Arc<dyn VideoFetcher>,
        extractor: Arc<dyn AudioExtractor>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            store,
            blobs,
            queue,
            fetcher,
            extractor,
            transcriber,
            summarizer,
        }
    }

    /// Poll the queue once and process the received item, if any.
    /// Returns `Ok(true)` when an item was processed, `Ok(false)` when the
    /// queue was empty.
    pub async fn run_once(&self, visibility: Duration) -> Result<bool, QueueError> {
        match self.queue.receive(visibility).await? {
            Some(delivery) => {
                self.process_batch(vec![delivery]).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Single entry point for both delivery mechanisms: a polling loop
    /// hands in a batch of one, a push-style invocation hands in however
    /// many it received. Items run strictly sequentially, and one item's
    /// failure never aborts the rest of the batch.
    pub async fn process_batch(&self, deliveries: Vec<Delivery>) -> usize {
        let mut completed = 0;
        for delivery in deliveries {
            if self.process_delivery(&delivery).await {
                completed += 1;
            }
        }
        completed
    }

    /// Process one delivery to a terminal state. Returns whether the task
    /// completed successfully.
    pub async fn process_delivery(&self, delivery: &Delivery) -> bool {
        let task_id = delivery.item.task_id;
        let start = std::time::Instant::now();

        tracing::info!(
            task_id = %task_id,
            title = %delivery.item.title,
            receive_count = delivery.receive_count,
            "Processing task"
        );

        match self.run_stages(&delivery.item).await {
            Ok(()) => {
                metrics::histogram!("lecture_pipeline_seconds").record(start.elapsed().as_secs_f64());
                metrics::counter!("lecture_tasks_completed").increment(1);

                // Acknowledge only after the terminal record is persisted.
                if let Err(e) = self.queue.ack(&delivery.receipt).await {
                    tracing::error!(
                        task_id = %task_id,
                        error = %e,
                        "Task completed but ack failed; expect a redundant redelivery"
                    );
                }
                tracing::info!(task_id = %task_id, "Task completed");
                true
            }
            Err(failure) => {
                metrics::counter!("lecture_tasks_failed").increment(1);
                tracing::error!(task_id = %task_id, error = %failure, "Task failed");

                if let Err(e) = self
                    .store
                    .update(task_id, TaskUpdate::failed(failure.to_string()))
                    .await
                {
                    tracing::error!(task_id = %task_id, error = %e, "Failed to record task failure");
                }
                // No ack: the item becomes visible again after the
                // visibility window and is redelivered, up to the queue's
                // max-receive policy.
                false
            }
        }
    }

    async fn run_stages(&self, item: &WorkItem) -> Result<(), StageFailure> {
        let task_id = item.task_id;

        // acquire
        self.checkpoint(task_id, 10, "Downloading video...").await?;
        let video = self
            .fetcher
            .fetch(&item.video_url)
            .await
            .map_err(|e| StageFailure::Acquire(e.to_string()))?;

        // transcode
        self.checkpoint(task_id, 30, "Extracting audio...").await?;
        let wav = self
            .extractor
            .extract_wav(&video)
            .await
            .map_err(|e| StageFailure::Transcode(e.to_string()))?;

        self.checkpoint(task_id, 40, "Encoding audio track...").await?;
        let mp3 = self
            .extractor
            .extract_mp3(&video)
            .await
            .map_err(|e| StageFailure::Transcode(e.to_string()))?;
        let video_duration = self.extractor.probe_duration(&video).await;

        // transcribe: mandatory, never substituted on failure
        self.checkpoint(task_id, 50, "Transcribing audio...").await?;
        let transcription = self
            .transcriber
            .transcribe(&wav)
            .await
            .map_err(|e| StageFailure::Transcribe(e.to_string()))?;
        if transcription.trim().is_empty() {
            return Err(StageFailure::Transcribe("no speech detected".to_string()));
        }

        // synthesize: summarizer failure degrades to an outline of the
        // raw transcript instead of aborting
        self.checkpoint(task_id, 80, "Generating summary...").await?;
        let summary = match self
            .summarizer
            .summarize(&item.title, &transcription)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    task_id = %task_id,
                    error = %e,
                    "Summarizer unavailable, using transcript outline"
                );
                notes::outline_fallback(&transcription)
            }
        };

        // render & persist
        self.checkpoint(task_id, 85, "Saving results...").await?;
        let transcript_doc = notes::transcript_document(
            &item.title,
            &item.description,
            &item.video_url,
            &transcription,
        );
        let abstract_doc = notes::notes_abstract(&item.title, &summary);
        let pdf_bytes = pdf::render(&item.title, &summary, &transcription)
            .map_err(|e| StageFailure::Render(e.to_string()))?;

        self.put_artifact(&transcript_key(task_id), transcript_doc.as_bytes(), "text/plain; charset=utf-8")
            .await?;
        self.put_artifact(&audio_key(task_id), &mp3, "audio/mpeg")
            .await?;
        self.put_artifact(&notes_key(task_id), &pdf_bytes, "application/pdf")
            .await?;
        self.put_artifact(&abstract_key(task_id), abstract_doc.as_bytes(), "text/plain; charset=utf-8")
            .await?;

        let update = TaskUpdate {
            status: Some(TaskStatus::Completed),
            progress: Some(100),
            status_message: Some("Processing completed".to_string()),
            transcription: Some(transcription),
            transcript_url: Some(self.blobs.public_url(&transcript_key(task_id))),
            audio_url: Some(self.blobs.public_url(&audio_key(task_id))),
            notes_url: Some(self.blobs.public_url(&notes_key(task_id))),
            video_duration,
            processed_at: Some(Utc::now()),
            ..Default::default()
        };
        self.store
            .update(task_id, update)
            .await
            .map_err(|e| StageFailure::Persist(e.to_string()))?;

        Ok(())
    }

    /// Persist a stage checkpoint so a crash mid-pipeline leaves an
    /// inspectable progress/status_message rather than silent staleness.
    async fn checkpoint(
        &self,
        task_id: Uuid,
        progress: u8,
        message: &str,
    ) -> Result<(), StageFailure> {
        self.store
            .update(task_id, TaskUpdate::checkpoint(progress, message))
            .await
            .map(|_| ())
            .map_err(|e| StageFailure::Persist(e.to_string()))
    }

    async fn put_artifact(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StageFailure> {
        self.blobs
            .put(key, data, content_type)
            .await
            .map_err(|e| StageFailure::Persist(format!("{key}: {e}")))
    }
}
