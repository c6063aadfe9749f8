//! Bus backend: whichever MPRIS player currently owns the desktop media bus
//!
//! Commands go out through `dbus-send`. MPRIS players apply commands and
//! publish the resulting properties asynchronously, so a status read issued
//! right after a command returns the *previous* state. Every mutating command
//! records when it was sent and [`MprisBackend::status`] waits out the settle
//! delay before reading.

use crate::parse::*;
use anyhow::Context;
use async_trait::async_trait;
use station_core::{
    extract_spotify_track_id, spotify_track_uri, BackendKind, ControlError, ControlResult,
    MediaReference, PlaybackBackend, RawPlayback, RawStatus, Volume,
};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;

const MPRIS_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

/// Wait between a bus command and a trustworthy status read
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct MprisConfig {
    /// Bus names containing any of these tokens are never controlled
    pub ignore_players: Vec<String>,
    /// Token of the player to prefer when several are registered
    pub preferred_player: Option<String>,
    pub settle_delay: Duration,
}

impl Default for MprisConfig {
    fn default() -> Self {
        Self {
            // mpv shows up here through mpv-mpris, and it is our own process backend
            ignore_players: ["mpv", "firefox", "chromium", "chrome", "kdeconnect"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            preferred_player: Some("spotify".to_string()),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Drop players matched by the identity filter
pub fn filter_players(names: Vec<String>, ignore: &[String]) -> Vec<String> {
    names
        .into_iter()
        .filter(|name| {
            let lower = name.to_lowercase();
            !ignore.iter().any(|token| lower.contains(&token.to_lowercase()))
        })
        .collect()
}

fn playback_from_str(status: &str) -> RawPlayback {
    match status {
        "Playing" => RawPlayback::Playing,
        "Paused" => RawPlayback::Paused,
        "Stopped" => RawPlayback::Stopped,
        _ => RawPlayback::Idle,
    }
}

pub struct MprisBackend {
    config: MprisConfig,
    player: Option<String>,
    last_command: Option<Instant>,
}

impl MprisBackend {
    pub fn new(config: MprisConfig) -> Self {
        Self {
            config,
            player: None,
            last_command: None,
        }
    }

    /// The bus name currently bound, if any
    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    async fn dbus_send(&self, args: &[&str]) -> ControlResult<String> {
        let binary = which::which("dbus-send").map_err(|_| {
            ControlError::AdapterUnavailable("'dbus-send' not found in PATH".to_string())
        })?;
        tracing::debug!("dbus-send {:?}", args);

        let output = Command::new(binary)
            .args(["--session", "--print-reply"])
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to run dbus-send")?;

        if !output.status.success() {
            return Err(ControlError::backend(format!(
                "dbus-send {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// All MPRIS players on the session bus that pass the identity filter
    pub async fn list_players(&self) -> ControlResult<Vec<String>> {
        let output = self
            .dbus_send(&[
                "--dest=org.freedesktop.DBus",
                "/org/freedesktop/DBus",
                "org.freedesktop.DBus.ListNames",
            ])
            .await?;

        Ok(filter_players(parse_player_names(&output), &self.config.ignore_players))
    }

    async fn get_property(&self, player: &str, property: &str) -> ControlResult<Option<VariantValue>> {
        let dest = format!("--dest={}", player);
        let interface = format!("string:{}", PLAYER_INTERFACE);
        let property = format!("string:{}", property);
        let output = self
            .dbus_send(&[
                dest.as_str(),
                MPRIS_PATH,
                "org.freedesktop.DBus.Properties.Get",
                interface.as_str(),
                property.as_str(),
            ])
            .await?;
        Ok(parse_property(&output))
    }

    /// Preferred player first, then one that is playing, then whichever is first
    async fn select_player(&self) -> ControlResult<String> {
        let players = self.list_players().await?;

        if let Some(preferred) = self.config.preferred_player.as_deref() {
            let preferred = preferred.to_lowercase();
            if let Some(player) = players.iter().find(|p| p.to_lowercase().contains(&preferred)) {
                return Ok(player.clone());
            }
        }

        for player in &players {
            if let Ok(Some(status)) = self.get_property(player, "PlaybackStatus").await {
                if status.as_str() == Some("Playing") {
                    tracing::debug!("Found playing player: {}", player);
                    return Ok(player.clone());
                }
            }
        }

        players
            .into_iter()
            .next()
            .ok_or_else(|| ControlError::AdapterUnavailable("no MPRIS player on the session bus".to_string()))
    }

    fn bound_player(&self) -> ControlResult<String> {
        self.player.clone().ok_or(ControlError::NoActiveSession)
    }

    /// Invoke a method on the player interface and start the settle clock
    async fn call(&mut self, method: &str, args: &[&str]) -> ControlResult<()> {
        let player = self.bound_player()?;
        let dest = format!("--dest={}", player);
        let member = format!("{}.{}", PLAYER_INTERFACE, method);

        let mut full_args = vec![dest.as_str(), MPRIS_PATH, member.as_str()];
        full_args.extend_from_slice(args);
        self.dbus_send(&full_args).await?;

        self.last_command = Some(Instant::now());
        Ok(())
    }

    /// Sleep until the settle delay since the last mutating command has passed
    pub async fn settle(&self) {
        if let Some(sent) = self.last_command {
            let elapsed = sent.elapsed();
            if elapsed < self.config.settle_delay {
                let remaining = self.config.settle_delay - elapsed;
                tracing::debug!("Waiting {:?} for the media bus to settle", remaining);
                tokio::time::sleep(remaining).await;
            }
        }
    }
}

#[async_trait]
impl PlaybackBackend for MprisBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bus
    }

    /// Open the reference in the selected bus player
    async fn start(&mut self, media: &MediaReference) -> ControlResult<()> {
        let player = self.select_player().await?;
        tracing::info!("Binding media bus player {}", player);
        self.player = Some(player);

        let uri = match extract_spotify_track_id(&media.canonical_url) {
            Some(track_id) => spotify_track_uri(&track_id),
            None => media.canonical_url.clone(),
        };
        let arg = format!("string:{}", uri);

        if let Err(e) = self.call("OpenUri", &[arg.as_str()]).await {
            self.player = None;
            return Err(e);
        }
        Ok(())
    }

    async fn play(&mut self) -> ControlResult<()> {
        self.call("Play", &[]).await
    }

    async fn pause(&mut self) -> ControlResult<()> {
        self.call("Pause", &[]).await
    }

    async fn stop(&mut self) -> ControlResult<()> {
        self.call("Stop", &[]).await?;
        self.player = None;
        Ok(())
    }

    async fn set_volume(&mut self, volume: Volume) -> ControlResult<()> {
        let player = self.bound_player()?;
        let dest = format!("--dest={}", player);
        let interface = format!("string:{}", PLAYER_INTERFACE);
        let value = format!("variant:double:{}", f64::from(volume.get()) / 100.0);

        self.dbus_send(&[
            dest.as_str(),
            MPRIS_PATH,
            "org.freedesktop.DBus.Properties.Set",
            interface.as_str(),
            "string:Volume",
            value.as_str(),
        ])
        .await?;

        self.last_command = Some(Instant::now());
        Ok(())
    }

    /// Read status after the settle delay; bus units (fraction, microseconds)
    async fn status(&mut self) -> ControlResult<RawStatus> {
        let player = self.bound_player()?;
        self.settle().await;

        let playback = self
            .get_property(&player, "PlaybackStatus")
            .await?
            .and_then(|v| v.as_str().map(playback_from_str))
            .unwrap_or_default();

        // Not every player implements Volume/Position
        let volume = self
            .get_property(&player, "Volume")
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_f64());
        let position = self
            .get_property(&player, "Position")
            .await
            .ok()
            .flatten()
            .and_then(|v| v.as_f64());

        let dest = format!("--dest={}", player);
        let interface = format!("string:{}", PLAYER_INTERFACE);
        let output = self
            .dbus_send(&[
                dest.as_str(),
                MPRIS_PATH,
                "org.freedesktop.DBus.Properties.Get",
                interface.as_str(),
                "string:Metadata",
            ])
            .await?;
        let metadata = parse_metadata(&output);

        Ok(RawStatus {
            playback,
            volume,
            position,
            duration: metadata.get("mpris:length").and_then(|v| v.parse().ok()),
            title: metadata.get("xesam:title").cloned(),
            artist: metadata
                .get("xesam:artist")
                .or_else(|| metadata.get("xesam:albumArtist"))
                .cloned(),
            url: metadata.get("xesam:url").cloned(),
        })
    }

    async fn is_running(&mut self) -> bool {
        let Some(player) = self.player.clone() else {
            return false;
        };

        match self.list_players().await {
            Ok(players) if players.contains(&player) => true,
            Ok(_) => {
                tracing::info!("Media bus player {} went away", player);
                self.player = None;
                false
            }
            Err(e) => {
                tracing::warn!("Failed to list media bus players: {}", e);
                false
            }
        }
    }

    async fn next(&mut self) -> ControlResult<()> {
        self.call("Next", &[]).await
    }

    async fn previous(&mut self) -> ControlResult<()> {
        self.call("Previous", &[]).await
    }
}
