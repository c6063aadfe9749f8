use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest volume accepted by the control surface (mpv allows amplification past 100)
pub const MAX_VOLUME: u8 = 150;

/// Volume reported before any backend has told us otherwise
pub const DEFAULT_VOLUME: u8 = 100;

/// Where a resolved piece of media is supposed to be played from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A link the local player process can open directly (YouTube and friends)
    DirectStream,
    /// A streaming-service track handed to the desktop client over the media bus
    StreamingService,
    /// A free-text query answered by the music daemon's own library
    LibraryQuery,
}

impl SourceKind {
    /// The backend that plays media of this kind
    pub fn backend(&self) -> BackendKind {
        match self {
            SourceKind::DirectStream => BackendKind::Process,
            SourceKind::StreamingService => BackendKind::Bus,
            SourceKind::LibraryQuery => BackendKind::Daemon,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DirectStream => "direct_stream",
            SourceKind::StreamingService => "streaming_service",
            SourceKind::LibraryQuery => "library_query",
        }
    }
}

/// A concrete, playable reference produced by the resolver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaReference {
    pub source_kind: SourceKind,
    pub canonical_url: String,
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    /// `None` when unknown (live streams, library queries)
    #[serde(default)]
    pub duration_seconds: Option<u64>,
    #[serde(default)]
    pub is_live: bool,
}

impl MediaReference {
    pub fn direct(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::DirectStream,
            canonical_url: url.into(),
            title: title.into(),
            uploader: None,
            duration_seconds: None,
            is_live: false,
        }
    }

    /// A daemon library lookup; the query doubles as the reference's url and title
    pub fn library_query(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            source_kind: SourceKind::LibraryQuery,
            canonical_url: query.clone(),
            title: query,
            uploader: None,
            duration_seconds: None,
            is_live: false,
        }
    }
}

/// The backends able to produce audible playback
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    None,
    Process,
    Daemon,
    Bus,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::None => "none",
            BackendKind::Process => "process",
            BackendKind::Daemon => "daemon",
            BackendKind::Bus => "bus",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical player status reported to clients
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
    Replay,
    Failed,
}

/// Which backend pairing the station runs with
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Player process for links, web search for free text
    #[default]
    Process,
    /// Music daemon answers free-text queries from its library
    Daemon,
}

/// Error type for invalid control mode strings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseControlModeError(String);

impl fmt::Display for ParseControlModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid control mode '{}' (expected 'process' or 'daemon')", self.0)
    }
}

impl std::error::Error for ParseControlModeError {}

impl FromStr for ControlMode {
    type Err = ParseControlModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "process" | "mpv" => Ok(ControlMode::Process),
            "daemon" | "mpd" => Ok(ControlMode::Daemon),
            other => Err(ParseControlModeError(other.to_string())),
        }
    }
}

/// A validated volume in `[0, MAX_VOLUME]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Volume(u8);

impl Volume {
    /// Rejects out-of-range values instead of clamping them
    pub fn new(value: i64) -> Result<Self, ControlError> {
        if (0..=i64::from(MAX_VOLUME)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ControlError::InvalidVolume(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(DEFAULT_VOLUME)
    }
}

/// The single canonical view of playback, independent of the backend producing it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub status: PlayerStatus,
    pub active_backend: BackendKind,
    pub volume: u8,
    pub is_paused: bool,
    pub current_media_type: Option<SourceKind>,
    pub media_name: Option<String>,
    pub media_uploader: Option<String>,
    pub media_duration_seconds: Option<u64>,
    pub media_progress_seconds: u64,
    pub is_live: bool,
    pub media_url: Option<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            status: PlayerStatus::Stopped,
            active_backend: BackendKind::None,
            volume: DEFAULT_VOLUME,
            is_paused: false,
            current_media_type: None,
            media_name: None,
            media_uploader: None,
            media_duration_seconds: None,
            media_progress_seconds: 0,
            is_live: false,
            media_url: None,
        }
    }
}

/// The last thing successfully played; survives `stop`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LastPlayed {
    pub title: String,
    pub canonical_url: String,
    pub source_kind: SourceKind,
}

impl From<&MediaReference> for LastPlayed {
    fn from(media: &MediaReference) -> Self {
        Self {
            title: media.title.clone(),
            canonical_url: media.canonical_url.clone(),
            source_kind: media.source_kind,
        }
    }
}

/// Playback state as a backend reports it, before normalization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RawPlayback {
    Playing,
    Paused,
    Stopped,
    /// Backend is alive but has not settled on a state yet (still loading)
    #[default]
    Idle,
}

/// Status read from a backend, in that backend's own units
///
/// Times are seconds for the process and daemon backends and microseconds on
/// the bus. Volume is a percentage for process/daemon and a fraction on the bus.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawStatus {
    pub playback: RawPlayback,
    pub volume: Option<f64>,
    pub position: Option<f64>,
    pub duration: Option<f64>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

/// A queued background download
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadJob {
    pub url: String,
    pub status: DownloadStatus,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: DownloadStatus::Queued,
        }
    }
}
