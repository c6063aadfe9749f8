mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use station_control::control_api::routes::{create_router, AppState};
use tower::ServiceExt;

fn router(h: &Harness) -> Router {
    create_router(AppState {
        station: h.station.clone(),
    })
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    };
    dispatch(router, request.unwrap()).await
}

/// Sends a body as-is, without a content type
async fn send_raw(router: &Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::from(body))
        .unwrap();
    dispatch(router, request).await
}

async fn dispatch(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_server_status_and_health() {
    let h = harness();
    let app = router(&h);

    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["player_status"], "stopped");
    assert!(body["version"].is_string());

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_play_pause_resume_flow() {
    let h = harness();
    let app = router(&h);

    let (status, body) = send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/first"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "playing");
    assert_eq!(body["active_backend"], "process");
    assert_eq!(body["media_name"], "First Video");
    assert_eq!(body["current_media_type"], "direct_stream");

    let (status, body) = send(&app, Method::POST, "/player/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paused");
    assert_eq!(body["is_paused"], true);

    let (status, body) = send(&app, Method::POST, "/player/play", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "playing");

    let (status, body) = send(&app, Method::GET, "/player", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["media_url"], "https://youtu.be/first");
}

#[tokio::test]
async fn test_play_by_song_name() {
    let h = harness();
    let app = router(&h);

    let (status, body) = send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"song_name": "comfortably numb"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active_backend"], "daemon");
}

#[tokio::test]
async fn test_play_body_without_content_type_is_not_a_resume() {
    let h = harness();
    let app = router(&h);

    send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/first"})),
    )
    .await;

    let (status, body) = send_raw(&app, "/player/play", r#"{"url": "https://youtu.be/second"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["media_url"], "https://youtu.be/second");
    assert_eq!(body["media_name"], "Second Video");
    assert!(calls(&h.log).contains(&"resolve https://youtu.be/second".to_string()));
    assert_eq!(h.process.bound().as_deref(), Some("https://youtu.be/second"));

    // Whitespace only still means resume
    let (status, body) = send_raw(&app, "/player/play", "  \n").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["media_url"], "https://youtu.be/second");
}

#[tokio::test]
async fn test_malformed_play_body_is_rejected() {
    let h = harness();
    let app = router(&h);

    send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/first"})),
    )
    .await;
    let before = calls(&h.log).len();

    let (status, body) = send_raw(&app, "/player/play", r#"{"url": "https://youtu.be/sec"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(calls(&h.log).len(), before);

    let (_, body) = send(&app, Method::GET, "/player", None).await;
    assert_eq!(body["media_url"], "https://youtu.be/first");
    assert_eq!(body["status"], "playing");
}

#[tokio::test]
async fn test_play_error_statuses() {
    let h = harness();
    let app = router(&h);

    let (status, body) = send(&app, Method::POST, "/player/play", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_target");

    let (status, _) = send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"song_name": "nothing like this"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_authenticated");

    h.process.fail(true);
    let (status, _) = send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/first"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (_, body) = send(&app, Method::GET, "/player", None).await;
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_commands_without_session() {
    let h = harness();
    let app = router(&h);

    let (status, _) = send(&app, Method::POST, "/player/pause", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/player/stop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::POST, "/player/next", None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "unsupported_operation");
}

#[tokio::test]
async fn test_volume_validation() {
    let h = harness();
    let app = router(&h);

    send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/first"})),
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/player/volume", Some(json!({"volume": 200}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_volume");

    let (_, body) = send(&app, Method::GET, "/player", None).await;
    assert_eq!(body["volume"], 100);

    let (status, body) = send(&app, Method::POST, "/player/volume", Some(json!({"volume": 75}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["volume"], 75);
}

#[tokio::test]
async fn test_stop_and_replay() {
    let h = harness();
    let app = router(&h);

    send(
        &app,
        Method::POST,
        "/player/play",
        Some(json!({"url": "https://youtu.be/second"})),
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/player/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
    assert_eq!(body["active_backend"], "none");

    let (status, body) = send(&app, Method::POST, "/player/replay", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "replay");
    assert_eq!(body["media_name"], "Second Video");
    assert_eq!(body["media_url"], "https://youtu.be/second");
}

#[tokio::test]
async fn test_downloads() {
    let h = harness();
    let app = router(&h);

    let (status, body) = send(
        &app,
        Method::POST,
        "/downloads",
        Some(json!({"url": "https://www.youtube.com/watch?v=eB3eXQOUvA8"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["route"], "queue");

    let (status, _) = send(
        &app,
        Method::POST,
        "/downloads",
        Some(json!({"url": "https://vimeo.com/12345"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The streaming downloader binary is not installed in the test harness
    let (status, _) = send(
        &app,
        Method::POST,
        "/downloads",
        Some(json!({"url": "https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    h.station.downloads().wait_until_done().await;
    let (status, body) = send(&app, Method::GET, "/downloads/progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], "All downloads complete");
    assert_eq!(body["pending"], 0);
}
