//! Media reference resolution: turns a url or a song name into something playable

pub mod spotify;
pub mod ytdlp;

pub use spotify::{FileTokenSource, SpotifyClient, SpotifyTrack, TokenSource, DEFAULT_API_BASE};
pub use ytdlp::{media_reference_from_json, YtDlp, YtDlpConfig};

use async_trait::async_trait;
use station_core::{
    classify_input, ControlError, ControlMode, ControlResult, InputKind, MediaReference,
    MediaResolver, SourceKind,
};

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub control_mode: ControlMode,
    /// Hand streaming tracks to the desktop client instead of searching for a direct source
    pub native_client: bool,
}

/// The resolver used by the station: yt-dlp for direct sources and search,
/// the Spotify Web API for streaming-service tracks
pub struct StationResolver {
    config: ResolverConfig,
    ytdlp: YtDlp,
    spotify: SpotifyClient,
}

impl StationResolver {
    pub fn new(config: ResolverConfig, ytdlp: YtDlp, spotify: SpotifyClient) -> Self {
        Self {
            config,
            ytdlp,
            spotify,
        }
    }

    /// Single best-match web search followed by metadata extraction of the hit
    async fn search_and_fetch(&self, query: &str) -> ControlResult<MediaReference> {
        let url = self
            .ytdlp
            .search(query)
            .await?
            .ok_or_else(|| ControlError::NoMatchFound(query.to_string()))?;
        tracing::debug!("Search for '{}' matched {}", query, url);
        self.ytdlp.fetch_metadata(&url).await
    }

    async fn resolve_streaming_track(&self, url: &str, track_id: &str) -> ControlResult<MediaReference> {
        let track = self.spotify.track(track_id).await?;

        if self.config.native_client {
            tracing::info!("Routing '{}' by {} to the native client", track.title, track.artist);
            return Ok(MediaReference {
                source_kind: SourceKind::StreamingService,
                canonical_url: url.to_string(),
                title: track.title,
                uploader: Some(track.artist),
                duration_seconds: Some(track.duration_ms / 1000),
                is_live: false,
            });
        }

        let query = format!("{} {}", track.title, track.artist);
        self.search_and_fetch(&query).await
    }
}

#[async_trait]
impl MediaResolver for StationResolver {
    async fn resolve(&self, input: &str) -> ControlResult<MediaReference> {
        match classify_input(input) {
            InputKind::DirectSource { url } => self.ytdlp.fetch_metadata(&url).await,
            InputKind::StreamingTrack { url, track_id } => {
                self.resolve_streaming_track(&url, &track_id).await
            }
            InputKind::StreamingCollection { url } | InputKind::UnsupportedUrl { url } => {
                Err(ControlError::UnsupportedSource(url))
            }
            InputKind::FreeText { query } if query.is_empty() => Err(ControlError::MissingTarget),
            InputKind::FreeText { query } => match self.config.control_mode {
                ControlMode::Daemon => Ok(MediaReference::library_query(query)),
                ControlMode::Process => self.search_and_fetch(&query).await,
            },
        }
    }
}
