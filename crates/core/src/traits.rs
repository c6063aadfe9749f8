use crate::error::{ControlError, ControlResult};
use crate::models::{BackendKind, MediaReference, RawStatus, Volume};
use async_trait::async_trait;

/// Trait for playback backends (player process, music daemon, media bus)
///
/// At most one backend holds a live session at a time; the control router is
/// responsible for stopping the others before calling `start`.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Bind the backend to a media reference and begin playback
    async fn start(&mut self, media: &MediaReference) -> ControlResult<()>;

    /// Resume playback of the bound media
    async fn play(&mut self) -> ControlResult<()>;

    async fn pause(&mut self) -> ControlResult<()>;

    /// Stop playback and drop the live session
    async fn stop(&mut self) -> ControlResult<()>;

    async fn set_volume(&mut self, volume: Volume) -> ControlResult<()>;

    /// Read the backend's current status in its native units
    async fn status(&mut self) -> ControlResult<RawStatus>;

    /// Whether the backend currently holds a live session
    async fn is_running(&mut self) -> bool;

    /// Skip to the next item (ordered-navigation backends only)
    async fn next(&mut self) -> ControlResult<()> {
        Err(ControlError::UnsupportedOperation("next"))
    }

    /// Go back to the previous item (ordered-navigation backends only)
    async fn previous(&mut self) -> ControlResult<()> {
        Err(ControlError::UnsupportedOperation("previous"))
    }
}

/// Turns user input (a link or a song name) into a playable reference
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, input: &str) -> ControlResult<MediaReference>;
}
