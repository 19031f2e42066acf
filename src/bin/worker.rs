use lecture_notes::{
    config::AppConfig,
    pipeline::Pipeline,
    services::{
        fetch::HttpVideoFetcher, media::FfmpegExtractor, queue::RedisQueue, storage::S3Store,
        summarize::SummaryApiClient, task_store::TaskStore, transcribe::SpeechApiClient,
    },
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting lecture-notes worker");

    // Load configuration
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize services
    tracing::info!("Initializing services");
    let blobs = Arc::new(
        S3Store::new(
            &config.bucket_name,
            &config.s3_endpoint,
            &config.s3_region,
            &config.s3_access_key,
            &config.s3_secret_key,
            &config.public_base_url,
        )
        .expect("Failed to initialize object storage client"),
    );

    let queue = Arc::new(
        RedisQueue::new(&config.redis_url, config.max_receives)
            .expect("Failed to initialize work queue"),
    );

    let fetcher = HttpVideoFetcher::new(Duration::from_secs(config.download_timeout_secs))
        .expect("Failed to initialize video fetcher");

    let transcriber = SpeechApiClient::new(&config.speech_api_url, &config.speech_api_key);
    let summarizer = SummaryApiClient::new(
        &config.summary_api_url,
        &config.summary_api_key,
        &config.summary_model,
    );

    let pipeline = Pipeline::new(
        TaskStore::new(blobs.clone()),
        blobs,
        queue.clone(),
        Arc::new(fetcher),
        Arc::new(FfmpegExtractor::default()),
        Arc::new(transcriber),
        Arc::new(summarizer),
    );

    let visibility = Duration::from_secs(config.visibility_timeout_secs);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);

    tracing::info!("Worker ready, starting task processing loop");

    // Main processing loop: one work item at a time. A task failure marks
    // its record and leaves the delivery for redelivery; only queue errors
    // reach the Err arm, and they never kill the loop.
    loop {
        match pipeline.run_once(visibility).await {
            Ok(true) => {
                tracing::debug!("Work item processed, checking for next item");
            }
            Ok(false) => {
                tracing::trace!("Queue empty, sleeping");
                refresh_queue_depth(queue.as_ref()).await;
                sleep(poll_interval).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Queue receive failed, will retry");
                sleep(poll_interval).await;
            }
        }
    }
}

async fn refresh_queue_depth(queue: &RedisQueue) {
    use lecture_notes::services::queue::WorkQueue;

    if let Ok(depth) = queue.depth().await {
        metrics::gauge!("lecture_queue_depth").set(depth as f64);
    }
}
