use crate::pipeline::{AudioFetcher, DownloadProgress, ProgressReporter};
use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

const PROGRESS_MARKER: &str = "[station-progress]";

/// yt-dlp progress template; fields are separated by `|`
const PROGRESS_TEMPLATE: &str = "download:[station-progress]%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s|%(progress._total_bytes_str)s";

/// Parse one line printed through [`PROGRESS_TEMPLATE`]
pub fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    let fields = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let mut parts = fields.split('|').map(str::trim);

    let mut field = |fallback: &str| {
        parts
            .next()
            .filter(|p| !p.is_empty() && *p != "NA")
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    };

    Some(DownloadProgress {
        percent: field("0%"),
        speed: field("0 B/s"),
        eta: field("--:--"),
        total: field("?"),
    })
}

/// Last non-empty stderr line, which is where yt-dlp puts its `ERROR:` message
fn failure_reason(stderr: &str) -> Option<&str> {
    stderr.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Downloads best audio with yt-dlp and transcodes it to mp3 with cover art and tags
pub struct YtDlpFetcher {
    binary: String,
    output_dir: PathBuf,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let template = self.output_dir.join("%(title)s.%(ext)s");
        [
            "-f",
            "bestaudio/best",
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
            "--embed-thumbnail",
            "--embed-metadata",
            "--force-overwrites",
            "--no-playlist",
            "--retries",
            "1",
            "--newline",
            "--progress-template",
            PROGRESS_TEMPLATE,
            "-o",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([template.to_string_lossy().into_owned(), url.to_string()])
        .collect()
    }
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, progress: &ProgressReporter) -> anyhow::Result<()> {
        let binary = which::which(&self.binary)
            .with_context(|| format!("'{}' not found in PATH", self.binary))?;
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.output_dir.display()))?;

        let mut child = Command::new(binary)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn yt-dlp")?;

        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("yt-dlp stderr not captured"))?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("yt-dlp stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_progress_line(&line) {
                Some(update) => progress.report(&update),
                None => tracing::debug!("yt-dlp: {}", line),
            }
        }

        let status = child.wait().await.context("Failed to wait for yt-dlp")?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            match failure_reason(&stderr) {
                Some(reason) => bail!("yt-dlp exited with {}: {}", status, reason),
                None => bail!("yt-dlp exited with {}", status),
            }
        }

        tracing::info!("Downloaded {} into {}", url, self.output_dir.display());
        Ok(())
    }
}
