use station_core::{ControlError, ControlResult};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Streaming-service downloads through `spotdl`
///
/// Each download runs as its own detached task and does not report through
/// the pipeline's progress string.
#[derive(Debug, Clone)]
pub struct StreamingDownloader {
    binary: String,
    output_dir: PathBuf,
}

impl StreamingDownloader {
    pub fn new(binary: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Start a background download; only a missing binary is reported to the caller
    pub fn spawn(&self, url: &str) -> ControlResult<JoinHandle<()>> {
        let binary = which::which(&self.binary).map_err(|_| {
            ControlError::AdapterUnavailable(format!("'{}' not found in PATH", self.binary))
        })?;

        let url = url.to_string();
        let output_dir = self.output_dir.clone();
        tracing::info!("Starting streaming download: {}", url);

        Ok(tokio::spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&output_dir).await {
                tracing::error!("Failed to create {}: {}", output_dir.display(), e);
                return;
            }

            let result = Command::new(binary)
                .arg("download")
                .arg(&url)
                .arg("--output")
                .arg(&output_dir)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await;

            match result {
                Ok(output) if output.status.success() => {
                    tracing::info!("Streaming download finished: {}", url)
                }
                Ok(output) => tracing::error!(
                    "Streaming download of {} failed ({}): {}",
                    url,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
                Err(e) => tracing::error!("Failed to run spotdl for {}: {}", url, e),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_fails_fast() {
        let downloader = StreamingDownloader::new("stream-station-no-such-spotdl", std::env::temp_dir());
        let result = downloader.spawn("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC");
        assert!(matches!(result, Err(ControlError::AdapterUnavailable(_))));
    }
}
