use crate::models::*;
use anyhow::Context;
use async_trait::async_trait;
use station_core::{
    BackendKind, ControlError, ControlResult, MediaReference, PlaybackBackend, RawStatus, Volume,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// MPD's own volume ceiling
const MPD_MAX_VOLUME: u8 = 100;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct MpdConfig {
    /// `mpc` binary name or path
    pub binary: String,
    pub host: String,
    pub port: u16,
}

impl Default for MpdConfig {
    fn default() -> Self {
        Self {
            binary: "mpc".to_string(),
            host: "localhost".to_string(),
            port: 6600,
        }
    }
}

/// Daemon backend: an always-running MPD driven through the `mpc` client
///
/// The daemon outlives us; a "session" here means we put something in its
/// playlist and have not stopped it since.
pub struct MpdController {
    config: MpdConfig,
    bound: bool,
}

impl MpdController {
    pub fn new(config: MpdConfig) -> Self {
        Self {
            config,
            bound: false,
        }
    }

    fn locate_binary(&self) -> ControlResult<PathBuf> {
        which::which(&self.config.binary).map_err(|_| {
            ControlError::AdapterUnavailable(format!("'{}' not found in PATH", self.config.binary))
        })
    }

    /// Run one `mpc` command against the configured daemon and return stdout
    async fn execute_command(&self, args: &[&str]) -> ControlResult<String> {
        let binary = self.locate_binary()?;
        tracing::debug!("mpc call: {:?}", args);

        let port = self.config.port.to_string();
        let output = tokio::time::timeout(
            COMMAND_TIMEOUT,
            Command::new(binary)
                .args(["--host", &self.config.host, "--port", &port])
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ControlError::backend(format!("mpc {:?} timed out", args)))?
        .context("Failed to run mpc")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Connection refused") || stderr.contains("No such file") {
                return Err(ControlError::AdapterUnavailable(format!(
                    "MPD not reachable at {}:{}",
                    self.config.host, self.config.port
                )));
            }
            return Err(ControlError::backend(format!(
                "mpc {:?} failed: {}",
                args,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn require_session(&self) -> ControlResult<()> {
        if self.bound {
            Ok(())
        } else {
            Err(ControlError::NoActiveSession)
        }
    }

    /// Read the daemon status regardless of whether we own the session
    pub async fn get_status(&self) -> ControlResult<MpdStatus> {
        let output = self.execute_command(&["-f", STATUS_FORMAT, "status"]).await?;
        Ok(parse_status(&output))
    }
}

/// Paths and uris go straight into the playlist; everything else is a library search
fn is_direct_uri(reference: &str) -> bool {
    reference.contains("://") || reference.starts_with('/') || reference.contains('/')
}

#[async_trait]
impl PlaybackBackend for MpdController {
    fn kind(&self) -> BackendKind {
        BackendKind::Daemon
    }

    /// Replace the daemon playlist with the reference and start playing it
    async fn start(&mut self, media: &MediaReference) -> ControlResult<()> {
        let reference = media.canonical_url.trim();

        self.execute_command(&["clear"]).await?;
        if is_direct_uri(reference) {
            self.execute_command(&["add", reference]).await?;
        } else {
            self.execute_command(&["searchadd", "any", reference]).await?;
        }

        let playlist = self.execute_command(&["playlist"]).await?;
        if playlist.trim().is_empty() {
            tracing::info!("MPD library has no match for '{}'", reference);
            return Err(ControlError::NoMatchFound(reference.to_string()));
        }

        self.execute_command(&["play"]).await?;
        self.bound = true;
        tracing::info!(
            "MPD playing '{}' ({} queued)",
            reference,
            playlist.lines().count()
        );
        Ok(())
    }

    async fn play(&mut self) -> ControlResult<()> {
        self.require_session()?;
        self.execute_command(&["play"]).await.map(|_| ())
    }

    async fn pause(&mut self) -> ControlResult<()> {
        self.require_session()?;
        self.execute_command(&["pause"]).await.map(|_| ())
    }

    async fn stop(&mut self) -> ControlResult<()> {
        self.require_session()?;
        self.execute_command(&["stop"]).await?;
        self.bound = false;
        Ok(())
    }

    async fn set_volume(&mut self, volume: Volume) -> ControlResult<()> {
        self.require_session()?;
        if volume.get() > MPD_MAX_VOLUME {
            return Err(ControlError::InvalidVolume(i64::from(volume.get())));
        }
        let value = volume.get().to_string();
        self.execute_command(&["volume", &value]).await.map(|_| ())
    }

    async fn status(&mut self) -> ControlResult<RawStatus> {
        self.require_session()?;
        let status = self.get_status().await?;

        Ok(RawStatus {
            playback: status.state.unwrap_or_default(),
            volume: status.volume,
            position: status.elapsed,
            duration: status.duration,
            title: status.title,
            artist: status.artist,
            url: None,
        })
    }

    async fn is_running(&mut self) -> bool {
        self.bound
    }
}
