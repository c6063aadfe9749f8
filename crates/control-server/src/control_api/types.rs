/// Request and response bodies for the control surface

use crate::station::DownloadRoute;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use station_core::{ControlError, PlayerStatus};

/// Body of POST /player/play; `url` wins over `song_name` when both are given
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
}

impl PlayRequest {
    pub fn target(&self) -> Option<&str> {
        [self.url.as_deref(), self.song_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
    }
}

/// Body of POST /player/volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRequest {
    pub volume: i64,
}

/// Body of POST /downloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
}

/// Response for POST /downloads
#[derive(Debug, Clone, Serialize)]
pub struct DownloadAccepted {
    pub url: String,
    pub route: DownloadRoute,
}

/// Response for GET /downloads/progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub progress: String,
    pub pending: usize,
}

/// Response for GET /
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub player_status: PlayerStatus,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// A [`ControlError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ControlError);

impl From<ControlError> for ApiError {
    fn from(error: ControlError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            error: self.0.kind().to_string(),
            details: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_request_target() {
        let request: PlayRequest = serde_json::from_str(r#"{"url": " https://youtu.be/x "}"#).unwrap();
        assert_eq!(request.target(), Some("https://youtu.be/x"));

        let request: PlayRequest =
            serde_json::from_str(r#"{"url": "https://youtu.be/x", "song_name": "time"}"#).unwrap();
        assert_eq!(request.target(), Some("https://youtu.be/x"));

        let request: PlayRequest = serde_json::from_str(r#"{"song_name": "time"}"#).unwrap();
        assert_eq!(request.target(), Some("time"));

        let request: PlayRequest = serde_json::from_str(r#"{"song_name": "  "}"#).unwrap();
        assert_eq!(request.target(), None);
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (ControlError::MissingTarget, StatusCode::BAD_REQUEST),
            (ControlError::NotAuthenticated, StatusCode::FORBIDDEN),
            (ControlError::NoMatchFound("x".into()), StatusCode::NOT_FOUND),
            (ControlError::UnsupportedOperation("next"), StatusCode::NOT_IMPLEMENTED),
            (ControlError::AdapterUnavailable("mpv".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError(error).into_response().status(), expected);
        }
    }
}
