use axum::response::Html;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lecture_notes::app_state::AppState;
use lecture_notes::config::AppConfig;
use lecture_notes::routes;
use lecture_notes::services::link_check::LinkValidator;
use lecture_notes::services::queue::RedisQueue;
use lecture_notes::services::storage::S3Store;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing lecture-notes server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("lecture_tasks_submitted", "Total lecture tasks submitted");
    metrics::describe_counter!("lecture_tasks_completed", "Total lecture tasks completed");
    metrics::describe_counter!("lecture_tasks_failed", "Total lecture tasks that failed");
    metrics::describe_histogram!(
        "lecture_pipeline_seconds",
        "Time to process one lecture task through the pipeline"
    );
    metrics::describe_gauge!(
        "lecture_queue_depth",
        "Current number of pending work items in the queue"
    );

    // Initialize object storage client
    tracing::info!("Initializing object storage client");
    let store = S3Store::new(
        &config.bucket_name,
        &config.s3_endpoint,
        &config.s3_region,
        &config.s3_access_key,
        &config.s3_secret_key,
        &config.public_base_url,
    )
    .expect("Failed to initialize object storage client");

    // Initialize Redis work queue
    tracing::info!("Connecting to Redis work queue");
    let queue =
        RedisQueue::new(&config.redis_url, config.max_receives).expect("Failed to initialize work queue");

    // Optional pre-submission link validation
    let link_validator = if config.validate_links {
        Some(LinkValidator::new().expect("Failed to initialize link validator"))
    } else {
        None
    };

    // Create shared application state
    let state = AppState::new(Arc::new(store), Arc::new(queue), link_validator);

    // Build API routes
    let app = Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../static/index.html")) }))
        // API endpoints
        .route("/health", get(routes::health::health_check))
        .route("/api/submit", post(routes::tasks::submit_task))
        .route("/api/tasks", get(routes::tasks::get_all_tasks))
        .route("/api/status/{task_id}", get(routes::tasks::get_task_status))
        .route("/api/tasks/{task_id}", delete(routes::tasks::delete_task))
        .route(
            "/download/{task_id}/transcript",
            get(routes::tasks::download_transcript),
        )
        .route(
            "/download/{task_id}/audio",
            get(routes::tasks::download_audio),
        )
        .route(
            "/download/{task_id}/notes",
            get(routes::tasks::download_notes),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1 MB limit

    tracing::info!("Starting lecture-notes on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
