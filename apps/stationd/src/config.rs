/// Station configuration file
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use station_core::{ControlMode, DEFAULT_VOLUME};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    pub bind: SocketAddr,
    pub control_mode: ControlMode,
    /// Send streaming-service tracks to the desktop client over the media bus
    pub native_client: bool,
    pub default_volume: u8,
    pub download_dir: PathBuf,
    pub mpv: MpvSettings,
    pub mpd: MpdSettings,
    pub bus: BusSettings,
    pub resolver: ResolverSettings,
    pub spotify: SpotifySettings,
    pub downloads: DownloadSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MpvSettings {
    pub binary: String,
    pub socket_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MpdSettings {
    pub binary: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusSettings {
    pub ignore_players: Vec<String>,
    pub preferred_player: Option<String>,
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub ytdlp_binary: String,
    pub metadata_timeout_secs: u64,
    pub search_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SpotifySettings {
    /// JSON token file maintained by the OAuth setup flow
    pub token_file: PathBuf,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub spotdl_binary: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            control_mode: ControlMode::Process,
            native_client: false,
            default_volume: DEFAULT_VOLUME,
            download_dir: default_download_dir(),
            mpv: MpvSettings::default(),
            mpd: MpdSettings::default(),
            bus: BusSettings::default(),
            resolver: ResolverSettings::default(),
            spotify: SpotifySettings::default(),
            downloads: DownloadSettings::default(),
        }
    }
}

impl Default for MpvSettings {
    fn default() -> Self {
        let mpv = station_device_mpv::MpvConfig::default();
        Self {
            binary: mpv.binary,
            socket_path: mpv.socket_path,
        }
    }
}

impl Default for MpdSettings {
    fn default() -> Self {
        let mpd = station_device_mpd::MpdConfig::default();
        Self {
            binary: mpd.binary,
            host: mpd.host,
            port: mpd.port,
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        let bus = station_media_session::MprisConfig::default();
        Self {
            ignore_players: bus.ignore_players,
            preferred_player: bus.preferred_player,
            settle_delay_ms: bus.settle_delay.as_millis() as u64,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            ytdlp_binary: "yt-dlp".to_string(),
            metadata_timeout_secs: 60,
            search_timeout_secs: 60,
        }
    }
}

impl Default for SpotifySettings {
    fn default() -> Self {
        Self {
            token_file: config_dir().join("spotify_token.json"),
            api_base: station_resolver::DEFAULT_API_BASE.to_string(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            spotdl_binary: "spotdl".to_string(),
        }
    }
}

/// `<config dir>/stream-station`, falling back to the working directory
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stream-station")
}

fn default_download_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stream-station")
}

impl StationConfig {
    pub fn default_path() -> PathBuf {
        config_dir().join("config.toml")
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.bus.settle_delay_ms)
    }
}
