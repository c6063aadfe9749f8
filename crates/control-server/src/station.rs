use crate::coordinator::SharedCoordinator;
use serde::Serialize;
use station_core::{
    classify_input, BackendKind, ControlError, ControlResult, InputKind, MediaResolver, PlayerState,
};
use station_downloads::{DownloadPipeline, StreamingDownloader};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where an accepted download went
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadRoute {
    /// The serialized queue, reported through the progress string
    Queue,
    /// A detached streaming-service download
    Background,
}

/// Command facade in front of the resolver, the control router and the downloads
///
/// Resolution runs before the coordinator lock is taken, so a slow lookup
/// never blocks status polls.
pub struct Station {
    resolver: Arc<dyn MediaResolver>,
    coordinator: SharedCoordinator,
    downloads: DownloadPipeline,
    streaming: StreamingDownloader,
    started_at: Instant,
}

impl Station {
    pub fn new(
        resolver: Arc<dyn MediaResolver>,
        coordinator: SharedCoordinator,
        downloads: DownloadPipeline,
        streaming: StreamingDownloader,
    ) -> Self {
        Self {
            resolver,
            coordinator,
            downloads,
            streaming,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn coordinator(&self) -> &SharedCoordinator {
        &self.coordinator
    }

    pub fn downloads(&self) -> &DownloadPipeline {
        &self.downloads
    }

    /// Play `input` (a url or a song name), or resume when there is none
    pub async fn play(&self, input: Option<&str>) -> ControlResult<PlayerState> {
        let media = match input.map(str::trim) {
            None => None,
            Some("") => return Err(ControlError::MissingTarget),
            Some(input) => Some(self.resolver.resolve(input).await?),
        };

        self.coordinator.lock().await.play(media).await
    }

    pub async fn pause(&self) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.pause().await
    }

    pub async fn stop(&self) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.stop().await
    }

    pub async fn replay(&self) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.replay().await
    }

    pub async fn set_volume(&self, volume: i64) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.set_volume(volume).await
    }

    pub async fn next(&self) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.next().await
    }

    pub async fn previous(&self) -> ControlResult<PlayerState> {
        self.coordinator.lock().await.previous().await
    }

    pub async fn status(&self) -> PlayerState {
        self.coordinator.lock().await.status().await
    }

    /// Direct sources join the queue; streaming-service links download in the background
    pub fn enqueue_download(&self, url: &str) -> ControlResult<DownloadRoute> {
        match classify_input(url) {
            InputKind::DirectSource { url } => {
                self.downloads.enqueue(url)?;
                Ok(DownloadRoute::Queue)
            }
            InputKind::StreamingTrack { url, .. } | InputKind::StreamingCollection { url } => {
                self.streaming.spawn(&url)?;
                Ok(DownloadRoute::Background)
            }
            InputKind::UnsupportedUrl { url } => Err(ControlError::UnsupportedSource(url)),
            InputKind::FreeText { query } if query.is_empty() => Err(ControlError::MissingTarget),
            InputKind::FreeText { query } => Err(ControlError::UnsupportedSource(query)),
        }
    }

    pub fn download_progress(&self) -> (String, usize) {
        (self.downloads.progress(), self.downloads.pending())
    }

    /// Drain the download queue and stop whatever is playing
    pub async fn shutdown(&self) {
        self.downloads.shutdown().await;

        let mut coordinator = self.coordinator.lock().await;
        if coordinator.session().active_backend() != BackendKind::None {
            if let Err(e) = coordinator.stop().await {
                tracing::warn!("Failed to stop playback on shutdown: {}", e);
            }
        }
    }
}
