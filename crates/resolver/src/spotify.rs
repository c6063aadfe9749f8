//! Spotify Web API track lookup
//!
//! Token acquisition and refresh happen elsewhere (the OAuth setup flow);
//! this module only reads whatever token it is handed.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use station_core::{ControlError, ControlResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";

/// Supplies a bearer token for the streaming-service API
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token, or `None` when unauthenticated or expired
    async fn access_token(&self) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct StoredToken {
    access_token: String,
    /// Unix timestamp in seconds
    #[serde(default)]
    expires_at: Option<i64>,
}

impl StoredToken {
    fn is_valid(&self, now: i64) -> bool {
        !self.access_token.is_empty() && self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Reads `{"access_token": ..., "expires_at": ...}` from a JSON file
pub struct FileTokenSource {
    path: PathBuf,
}

impl FileTokenSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenSource for FileTokenSource {
    async fn access_token(&self) -> Option<String> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!("No streaming token at {}: {}", self.path.display(), e);
                return None;
            }
        };

        let token: StoredToken = match serde_json::from_str(&contents) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Malformed token file {}: {}", self.path.display(), e);
                return None;
            }
        };

        if !token.is_valid(chrono::Utc::now().timestamp()) {
            tracing::info!("Streaming token in {} has expired", self.path.display());
            return None;
        }

        Some(token.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    name: String,
    #[serde(default)]
    artists: Vec<ArtistResponse>,
    #[serde(default)]
    duration_ms: u64,
}

#[derive(Debug, Deserialize)]
struct ArtistResponse {
    name: String,
}

/// The track fields the resolver needs
#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyTrack {
    pub title: String,
    pub artist: String,
    pub duration_ms: u64,
}

impl From<TrackResponse> for SpotifyTrack {
    fn from(track: TrackResponse) -> Self {
        Self {
            title: track.name,
            artist: track
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default(),
            duration_ms: track.duration_ms,
        }
    }
}

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base: String,
    tokens: Arc<dyn TokenSource>,
}

impl SpotifyClient {
    pub fn new(tokens: Arc<dyn TokenSource>, api_base: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.access_token().await.is_some()
    }

    /// Look up a track by id; fails with `NotAuthenticated` before any request without a token
    pub async fn track(&self, track_id: &str) -> ControlResult<SpotifyTrack> {
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or(ControlError::NotAuthenticated)?;

        let url = format!("{}/tracks/{}", self.api_base, track_id);
        tracing::debug!("Fetching streaming track {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ControlError::ResolutionFailed(format!("track lookup failed: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => return Err(ControlError::NotAuthenticated),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                return Err(ControlError::NoMatchFound(track_id.to_string()))
            }
            status => {
                return Err(ControlError::ResolutionFailed(format!(
                    "track lookup returned {}",
                    status
                )))
            }
        }

        let track: TrackResponse = response
            .json()
            .await
            .map_err(|e| ControlError::ResolutionFailed(format!("invalid track response: {}", e)))?;
        Ok(track.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("stream-station-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_valid_token() {
        let expires = chrono::Utc::now().timestamp() + 3600;
        let path = token_file("valid", &format!(r#"{{"access_token": "abc", "expires_at": {}}}"#, expires));
        assert_eq!(FileTokenSource::new(&path).access_token().await.as_deref(), Some("abc"));
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_expired_token() {
        let path = token_file("expired", r#"{"access_token": "abc", "expires_at": 1000}"#);
        assert_eq!(FileTokenSource::new(&path).access_token().await, None);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_and_malformed_token() {
        let missing = FileTokenSource::new(std::env::temp_dir().join("stream-station-absent.json"));
        assert_eq!(missing.access_token().await, None);

        let path = token_file("malformed", "not json");
        assert_eq!(FileTokenSource::new(&path).access_token().await, None);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_track_response_mapping() {
        let response: TrackResponse = serde_json::from_str(
            r#"{"name": "Time", "artists": [{"name": "Pink Floyd"}, {"name": "Other"}], "duration_ms": 413000}"#,
        )
        .unwrap();
        let track = SpotifyTrack::from(response);
        assert_eq!(track.title, "Time");
        assert_eq!(track.artist, "Pink Floyd");
        assert_eq!(track.duration_ms, 413000);
    }

    #[tokio::test]
    async fn test_lookup_without_token_makes_no_request() {
        let tokens = Arc::new(FileTokenSource::new(std::env::temp_dir().join("stream-station-absent.json")));
        let client = SpotifyClient::new(tokens, "http://127.0.0.1:9").unwrap();
        assert!(!client.is_authenticated().await);
        assert!(matches!(client.track("abc").await, Err(ControlError::NotAuthenticated)));
    }
}
