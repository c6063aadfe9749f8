//! Session State Manager
//!
//! Owns the canonical [`PlayerState`] and the [`LastPlayed`] record. Every
//! status mutation goes through here so the backend-specific units and status
//! vocabularies are normalized in exactly one place.

use crate::models::{
    BackendKind, LastPlayed, MediaReference, PlayerState, PlayerStatus, RawPlayback, RawStatus,
    DEFAULT_VOLUME, MAX_VOLUME,
};

#[derive(Clone, Debug)]
pub struct SessionState {
    player: PlayerState,
    last_played: Option<LastPlayed>,
    default_volume: u8,
}

impl SessionState {
    pub fn new(default_volume: u8) -> Self {
        let default_volume = default_volume.min(MAX_VOLUME);
        Self {
            player: PlayerState {
                volume: default_volume,
                ..PlayerState::default()
            },
            last_played: None,
            default_volume,
        }
    }

    /// Copy of the canonical state
    pub fn snapshot(&self) -> PlayerState {
        self.player.clone()
    }

    pub fn active_backend(&self) -> BackendKind {
        self.player.active_backend
    }

    pub fn status(&self) -> PlayerStatus {
        self.player.status
    }

    pub fn last_played(&self) -> Option<&LastPlayed> {
        self.last_played.as_ref()
    }

    fn set_status(&mut self, status: PlayerStatus) {
        self.player.status = status;
        self.player.is_paused = status == PlayerStatus::Paused;
    }

    /// Merge a backend's raw status into the canonical state
    pub fn apply_raw_status(&mut self, kind: BackendKind, raw: &RawStatus) -> PlayerState {
        if let Some(volume) = raw.volume {
            self.player.volume = canonical_volume(kind, volume);
        }

        if let Some(position) = raw.position {
            self.player.media_progress_seconds = canonical_seconds(kind, position);
        }

        if let Some(duration) = raw.duration {
            let seconds = canonical_seconds(kind, duration);
            // Live streams report no (or zero) length
            if seconds > 0 {
                self.player.media_duration_seconds = Some(seconds);
            }
        }

        if let Some(title) = raw.title.as_ref().filter(|t| !t.is_empty()) {
            self.player.media_name = Some(title.clone());
        }
        if let Some(artist) = raw.artist.as_ref().filter(|a| !a.is_empty()) {
            self.player.media_uploader = Some(artist.clone());
        }
        if let Some(url) = raw.url.as_ref().filter(|u| !u.is_empty()) {
            self.player.media_url = Some(url.clone());
        }

        if self.player.status != PlayerStatus::Failed {
            match raw.playback {
                RawPlayback::Playing => self.set_status(PlayerStatus::Playing),
                RawPlayback::Paused => self.set_status(PlayerStatus::Paused),
                RawPlayback::Stopped => self.set_status(PlayerStatus::Stopped),
                RawPlayback::Idle => {}
            }
        }

        tracing::debug!(
            "Applied {} status: {:?} vol={} pos={}s",
            kind,
            self.player.status,
            self.player.volume,
            self.player.media_progress_seconds
        );

        self.snapshot()
    }

    /// A backend switch is underway
    pub fn begin_loading(&mut self, kind: BackendKind) {
        self.player.active_backend = kind;
        self.set_status(PlayerStatus::Loading);
    }

    /// The backend accepted the media: record it as playing and as last played
    pub fn bind(&mut self, kind: BackendKind, media: &MediaReference) {
        self.player.active_backend = kind;
        self.set_status(PlayerStatus::Playing);
        self.player.current_media_type = Some(media.source_kind);
        self.player.media_name = Some(media.title.clone());
        self.player.media_uploader = media.uploader.clone();
        self.player.media_duration_seconds = media.duration_seconds;
        self.player.media_progress_seconds = 0;
        self.player.is_live = media.is_live;
        self.player.media_url = Some(media.canonical_url.clone());
        self.last_played = Some(LastPlayed::from(media));
    }

    pub fn mark_replay(&mut self) {
        self.set_status(PlayerStatus::Replay);
    }

    pub fn mark_failed(&mut self) {
        self.set_status(PlayerStatus::Failed);
    }

    /// Detach a backend that failed while being started
    pub fn detach_failed(&mut self) {
        self.player.active_backend = BackendKind::None;
        self.set_status(PlayerStatus::Failed);
    }

    /// `Failed -> Stopped` after a command succeeds
    pub fn recover(&mut self) {
        if self.player.status == PlayerStatus::Failed {
            self.set_status(PlayerStatus::Stopped);
        }
    }

    /// Back to defaults with no active backend; `LastPlayed` is kept
    pub fn reset(&mut self) {
        self.player = PlayerState {
            volume: self.default_volume,
            ..PlayerState::default()
        };
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

fn canonical_volume(kind: BackendKind, raw: f64) -> u8 {
    let percent = match kind {
        BackendKind::Bus => raw * 100.0,
        _ => raw,
    };
    if !percent.is_finite() {
        return 0;
    }
    percent.round().clamp(0.0, f64::from(MAX_VOLUME)) as u8
}

fn canonical_seconds(kind: BackendKind, raw: f64) -> u64 {
    let seconds = match kind {
        BackendKind::Bus => raw / 1_000_000.0,
        _ => raw,
    };
    if !seconds.is_finite() || seconds < 0.0 {
        return 0;
    }
    seconds.floor() as u64
}
