use crate::models::*;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::Value;
use station_core::{
    BackendKind, ControlError, ControlResult, MediaReference, PlaybackBackend, RawPlayback,
    RawStatus, Volume, MAX_VOLUME,
};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};

/// How long a single IPC round trip may take
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// How long `quit` gets before the process is killed
const QUIT_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct MpvConfig {
    /// Binary name or path, looked up in PATH
    pub binary: String,
    /// Where mpv creates its IPC socket
    pub socket_path: PathBuf,
    /// How long to wait for the socket after spawning
    pub startup_timeout: Duration,
    /// Volume the first process starts at; later ones reuse the last level set
    pub default_volume: Option<Volume>,
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            binary: "mpv".to_string(),
            socket_path: std::env::temp_dir().join("stream-station-mpv.sock"),
            startup_timeout: Duration::from_secs(10),
            default_volume: None,
        }
    }
}

/// Process backend: one mpv process per bound media, driven over JSON IPC
///
/// mpv answers property reads synchronously, so this is the backend with the
/// freshest status.
pub struct MpvController {
    config: MpvConfig,
    child: Option<Child>,
    next_request_id: u64,
    volume: Option<Volume>,
}

impl MpvController {
    pub fn new(config: MpvConfig) -> Self {
        let volume = config.default_volume;
        Self {
            config,
            child: None,
            next_request_id: 0,
            volume,
        }
    }

    /// Command line for a new mpv process bound to `url`
    fn spawn_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--no-video".to_string(),
            "--no-terminal".to_string(),
            "--idle=no".to_string(),
            format!("--volume-max={}", MAX_VOLUME),
            format!("--input-ipc-server={}", self.config.socket_path.display()),
        ];
        if let Some(volume) = self.volume {
            args.push(format!("--volume={}", volume.get()));
        }
        args.push(url.to_string());
        args
    }

    fn locate_binary(&self) -> ControlResult<PathBuf> {
        which::which(&self.config.binary).map_err(|_| {
            ControlError::AdapterUnavailable(format!("'{}' not found in PATH", self.config.binary))
        })
    }

    /// Wait until mpv has created its IPC socket and accepts connections
    async fn wait_for_socket(&mut self) -> ControlResult<()> {
        let deadline = Instant::now() + self.config.startup_timeout;

        loop {
            if UnixStream::connect(&self.config.socket_path).await.is_ok() {
                tracing::debug!("mpv IPC socket ready at {}", self.config.socket_path.display());
                return Ok(());
            }

            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(exit)) = child.try_wait() {
                    self.child = None;
                    return Err(ControlError::backend(format!("mpv exited during startup ({})", exit)));
                }
            }

            if Instant::now() >= deadline {
                return Err(ControlError::backend(format!(
                    "mpv IPC socket did not appear at {}",
                    self.config.socket_path.display()
                )));
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Execute an IPC command and return its `data` field
    async fn execute_command(&mut self, command: Vec<Value>) -> ControlResult<Option<Value>> {
        if self.child.is_none() {
            return Err(ControlError::NoActiveSession);
        }

        self.next_request_id += 1;
        let request = IpcRequest {
            command,
            request_id: self.next_request_id,
        };
        tracing::debug!("mpv IPC call: {:?}", request.command);

        let response = tokio::time::timeout(COMMAND_TIMEOUT, self.round_trip(&request))
            .await
            .map_err(|_| anyhow!("mpv did not answer within {:?}", COMMAND_TIMEOUT))??;

        if !response.is_success() {
            return Err(ControlError::backend(format!(
                "mpv rejected {:?}: {}",
                request.command,
                response.error.unwrap_or_default()
            )));
        }

        Ok(response.data)
    }

    async fn round_trip(&self, request: &IpcRequest) -> anyhow::Result<IpcResponse> {
        let stream = UnixStream::connect(&self.config.socket_path)
            .await
            .context("Failed to connect to mpv IPC socket")?;
        let (reader, mut writer) = stream.into_split();

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to mpv IPC socket")?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let response: IpcResponse = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Skipping unparsable mpv line '{}': {}", line, e);
                    continue;
                }
            };

            if response.request_id == Some(request.request_id) {
                return Ok(response);
            }
        }

        Err(anyhow!("mpv closed the IPC connection"))
    }

    async fn set_property(&mut self, name: &str, value: Value) -> ControlResult<()> {
        self.execute_command(vec!["set_property".into(), name.into(), value])
            .await
            .map(|_| ())
    }

    /// Read a property; unavailable properties (e.g. `time-pos` while loading) read as `None`
    async fn get_property(&mut self, name: &str) -> ControlResult<Option<Value>> {
        match self
            .execute_command(vec!["get_property".into(), name.into()])
            .await
        {
            Ok(data) => Ok(data),
            Err(ControlError::Backend(e)) if e.to_string().contains("property unavailable") => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Ask mpv to quit, then reap (or kill) the process
    async fn shutdown_child(&mut self) -> ControlResult<()> {
        if let Err(e) = self.execute_command(vec!["quit".into()]).await {
            tracing::debug!("mpv quit command failed: {}", e);
        }

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(QUIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => tracing::debug!("mpv exited with {}", status),
                Ok(Err(e)) => tracing::warn!("Failed to wait for mpv: {}", e),
                Err(_) => {
                    tracing::warn!("mpv did not quit within {:?}, killing it", QUIT_GRACE);
                    child
                        .kill()
                        .await
                        .context("Failed to kill mpv process")?;
                }
            }
        }

        let _ = tokio::fs::remove_file(&self.config.socket_path).await;
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for MpvController {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    /// Spawn mpv bound to the reference's url
    ///
    /// Any previous mpv process owned by this controller is shut down first.
    async fn start(&mut self, media: &MediaReference) -> ControlResult<()> {
        let binary = self.locate_binary()?;

        if self.child.is_some() {
            self.shutdown_child().await?;
        }
        let _ = tokio::fs::remove_file(&self.config.socket_path).await;

        let mut command = Command::new(binary);
        command
            .args(self.spawn_args(&media.canonical_url))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = command.spawn().context("Failed to spawn mpv")?;
        tracing::info!("Spawned mpv (pid {:?}) for {}", child.id(), media.canonical_url);
        self.child = Some(child);

        self.wait_for_socket().await
    }

    async fn play(&mut self) -> ControlResult<()> {
        self.set_property("pause", Value::Bool(false)).await
    }

    async fn pause(&mut self) -> ControlResult<()> {
        self.set_property("pause", Value::Bool(true)).await
    }

    async fn stop(&mut self) -> ControlResult<()> {
        if self.child.is_none() {
            return Err(ControlError::NoActiveSession);
        }
        self.shutdown_child().await
    }

    async fn set_volume(&mut self, volume: Volume) -> ControlResult<()> {
        self.set_property("volume", Value::from(volume.get())).await?;
        self.volume = Some(volume);
        Ok(())
    }

    async fn status(&mut self) -> ControlResult<RawStatus> {
        let paused = self.get_property("pause").await?.and_then(|v| v.as_bool());
        let idle = self.get_property("idle-active").await?.and_then(|v| v.as_bool());
        let position = self.get_property("time-pos").await?.and_then(|v| v.as_f64());
        let duration = self.get_property("duration").await?.and_then(|v| v.as_f64());
        let volume = self.get_property("volume").await?.and_then(|v| v.as_f64());
        let title = self
            .get_property("media-title")
            .await?
            .and_then(|v| v.as_str().map(str::to_string));
        let path = self
            .get_property("path")
            .await?
            .and_then(|v| v.as_str().map(str::to_string));

        let playback = match (idle, paused, position) {
            (Some(true), _, _) => RawPlayback::Stopped,
            (_, Some(true), _) => RawPlayback::Paused,
            (_, _, None) => RawPlayback::Idle,
            _ => RawPlayback::Playing,
        };

        Ok(RawStatus {
            playback,
            volume,
            position,
            duration,
            title,
            artist: None,
            url: path,
        })
    }

    async fn is_running(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::info!("mpv exited on its own ({})", status);
                self.child = None;
                false
            }
            Err(e) => {
                tracing::warn!("Failed to poll mpv process: {}", e);
                false
            }
        }
    }
}
