/// Route handlers for the control surface

use super::types::*;
use crate::station::Station;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use station_core::{ControlError, PlayerState};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub station: Arc<Station>,
}

type PlayerResult = Result<Json<PlayerState>, ApiError>;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(server_status))
        .route("/health", get(health_check))
        .route("/player", get(get_player))
        .route("/player/play", post(play))
        .route("/player/pause", post(pause))
        .route("/player/stop", post(stop))
        .route("/player/replay", post(replay))
        .route("/player/volume", post(set_volume))
        .route("/player/next", post(next))
        .route("/player/previous", post(previous))
        .route("/downloads", post(enqueue_download))
        .route("/downloads/progress", get(download_progress))
        .with_state(state)
}

/// GET / - Server status
async fn server_status(State(state): State<AppState>) -> Response {
    debug!("GET /");

    let player = state.station.status().await;
    let response = ServerStatusResponse {
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.station.uptime().as_secs(),
        player_status: player.status,
    };

    Json(response).into_response()
}

/// GET /health - Liveness check
async fn health_check() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

/// GET /player - Refresh and return the canonical player state
async fn get_player(State(state): State<AppState>) -> Json<PlayerState> {
    debug!("GET /player");
    Json(state.station.status().await)
}

/// POST /player/play - Play a url or song name, or resume with an empty body
///
/// The body is parsed regardless of content type so that clients which omit
/// the header still reach the requested media instead of resuming.
async fn play(State(state): State<AppState>, body: Bytes) -> PlayerResult {
    let player = match parse_play_body(&body)? {
        None => {
            info!("POST /player/play (resume)");
            state.station.play(None).await?
        }
        Some(request) => {
            let target = request.target().ok_or(ControlError::MissingTarget)?;
            info!("POST /player/play: {}", target);
            state.station.play(Some(target)).await?
        }
    };

    Ok(Json(player))
}

fn parse_play_body(body: &[u8]) -> Result<Option<PlayRequest>, ControlError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ControlError::InvalidRequest(e.to_string()))
}

/// POST /player/pause
async fn pause(State(state): State<AppState>) -> PlayerResult {
    info!("POST /player/pause");
    Ok(Json(state.station.pause().await?))
}

/// POST /player/stop
async fn stop(State(state): State<AppState>) -> PlayerResult {
    info!("POST /player/stop");
    Ok(Json(state.station.stop().await?))
}

/// POST /player/replay - Restart the last played media
async fn replay(State(state): State<AppState>) -> PlayerResult {
    info!("POST /player/replay");
    Ok(Json(state.station.replay().await?))
}

/// POST /player/volume
async fn set_volume(State(state): State<AppState>, Json(request): Json<VolumeRequest>) -> PlayerResult {
    info!("POST /player/volume: {}", request.volume);
    Ok(Json(state.station.set_volume(request.volume).await?))
}

/// POST /player/next
async fn next(State(state): State<AppState>) -> PlayerResult {
    info!("POST /player/next");
    Ok(Json(state.station.next().await?))
}

/// POST /player/previous
async fn previous(State(state): State<AppState>) -> PlayerResult {
    info!("POST /player/previous");
    Ok(Json(state.station.previous().await?))
}

/// POST /downloads - Queue a download
async fn enqueue_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Result<Response, ApiError> {
    info!("POST /downloads: {}", request.url);

    let route = state.station.enqueue_download(&request.url)?;
    let response = DownloadAccepted {
        url: request.url,
        route,
    };

    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

/// GET /downloads/progress
async fn download_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    debug!("GET /downloads/progress");

    let (progress, pending) = state.station.download_progress();
    Json(ProgressResponse { progress, pending })
}
