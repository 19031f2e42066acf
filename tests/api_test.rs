mod helpers;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::{delete, get, post};
use axum::Router;
use helpers::TestHarness;
use lecture_notes::app_state::AppState;
use lecture_notes::routes;
use tower::ServiceExt;
use uuid::Uuid;

fn router(harness: &TestHarness) -> Router {
    let state = AppState::new(harness.blobs.clone(), harness.queue.clone(), None);
    Router::new()
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
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn submit_task(app: &Router) -> Uuid {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/submit",
            serde_json::json!({
                "title": "Intro to ML",
                "video_url": "https://valid.example/video.mp4"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["task_id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn submit_then_poll_returns_processing_record() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let task_id = submit_task(&app).await;

    let response = app
        .clone()
        .oneshot(get_req(&format!("/api/status/{task_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "processing");
    assert_eq!(body["progress"], 10);
    assert_eq!(body["title"], "Intro to ML");
}

#[tokio::test]
async fn empty_video_url_is_rejected_with_400() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/submit",
            serde_json::json!({ "title": "Intro to ML", "video_url": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].is_string());

    // No task leaked into the listing.
    let response = app.clone().oneshot(get_req("/api/tasks")).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body, serde_json::json!({}));
}

#[tokio::test]
async fn unknown_task_returns_404_with_known_ids() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let known = submit_task(&app).await;
    let unknown = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(get_req(&format!("/api/status/{unknown}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Task not found");
    assert_eq!(body["task_id"], unknown.to_string());
    let available: Vec<String> = body["available_tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(available.contains(&known.to_string()));

    // Delete on the same unknown id is also a 404, not a crash.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/tasks/{unknown}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn artifact_download_distinguishes_missing_task_from_missing_artifact() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let task_id = submit_task(&app).await;

    // Task exists but has not reached the transcript stage.
    let response = app
        .clone()
        .oneshot(get_req(&format!("/download/{task_id}/transcript")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Task has no transcript yet");

    // Unknown task reads differently.
    let response = app
        .clone()
        .oneshot(get_req(&format!("/download/{}/transcript", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn completed_task_serves_downloads() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let task_id = submit_task(&app).await;
    harness
        .pipeline
        .run_once(Duration::from_secs(60))
        .await
        .unwrap();

    // Transcript comes back as an attachment.
    let response = app
        .clone()
        .oneshot(get_req(&format!("/download/{task_id}/transcript")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(!bytes.is_empty());

    // Audio and notes redirect to their stored URLs.
    for artifact in ["audio", "notes"] {
        let response = app
            .clone()
            .oneshot(get_req(&format!("/download/{task_id}/{artifact}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(location.starts_with("https://blobs.test/"));
    }
}

#[tokio::test]
async fn deleting_a_completed_task_removes_it_from_the_api() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let task_id = submit_task(&app).await;
    harness
        .pipeline
        .run_once(Duration::from_secs(60))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/tasks/{task_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["deleted"], task_id.to_string());

    let response = app
        .clone()
        .oneshot(get_req(&format!("/api/status/{task_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(get_req(&format!("/download/{task_id}/notes")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_ok_over_healthy_fakes() {
    let harness = TestHarness::new();
    let app = router(&harness);

    let response = app.clone().oneshot(get_req("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["storage"]["status"], "ok");
    assert_eq!(body["checks"]["queue"]["status"], "ok");
}
