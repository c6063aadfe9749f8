use anyhow::Context;
use serde_json::Value;
use station_core::{ControlError, ControlResult, MediaReference, SourceKind};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub binary: String,
    /// Ceiling on `yt-dlp -j` metadata extraction
    pub metadata_timeout: Duration,
    /// Ceiling on a `ytsearch1:` lookup
    pub search_timeout: Duration,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            metadata_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(60),
        }
    }
}

/// Map the JSON printed by `yt-dlp -j` into a direct-source reference
pub fn media_reference_from_json(info: &Value) -> ControlResult<MediaReference> {
    let url = info
        .get("webpage_url")
        .or_else(|| info.get("original_url"))
        .and_then(Value::as_str)
        .ok_or_else(|| ControlError::ResolutionFailed("metadata has no url".to_string()))?;

    let title = info
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let uploader = info
        .get("uploader")
        .or_else(|| info.get("channel"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let is_live = info.get("is_live").and_then(Value::as_bool).unwrap_or(false);

    // Live streams report no duration, or a meaningless one
    let duration_seconds = if is_live {
        None
    } else {
        info.get("duration")
            .and_then(Value::as_f64)
            .filter(|d| *d > 0.0)
            .map(|d| d as u64)
    };

    Ok(MediaReference {
        source_kind: SourceKind::DirectStream,
        canonical_url: url.to_string(),
        title,
        uploader,
        duration_seconds,
        is_live,
    })
}

/// Wrapper around the `yt-dlp` binary for metadata extraction and search
#[derive(Debug, Clone)]
pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Run yt-dlp and return stdout, bounded by `limit`
    async fn run(&self, args: &[&str], limit: Duration) -> ControlResult<String> {
        let binary = which::which(&self.config.binary).map_err(|_| {
            ControlError::ResolutionFailed(format!("'{}' not found in PATH", self.config.binary))
        })?;
        tracing::debug!("yt-dlp call: {:?}", args);

        let output = tokio::time::timeout(
            limit,
            Command::new(binary)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            tracing::warn!("yt-dlp {:?} timed out after {:?}", args, limit);
            ControlError::ResolutionTimeout(limit.as_secs())
        })?
        .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("yt-dlp exited with an error")
                .trim()
                .to_string();
            return Err(ControlError::ResolutionFailed(reason));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Extract metadata for a single direct-source url
    pub async fn fetch_metadata(&self, url: &str) -> ControlResult<MediaReference> {
        let stdout = self
            .run(&["-j", "--no-playlist", url], self.config.metadata_timeout)
            .await?;

        let info: Value = serde_json::from_str(stdout.trim())
            .map_err(|e| ControlError::ResolutionFailed(format!("invalid yt-dlp output: {}", e)))?;
        let media = media_reference_from_json(&info)?;
        tracing::info!("Resolved {} to '{}'", url, media.title);
        Ok(media)
    }

    /// Best-match url for a free-text query, `None` when the search finds nothing
    pub async fn search(&self, query: &str) -> ControlResult<Option<String>> {
        let target = format!("ytsearch1:{}", query);
        let stdout = self
            .run(
                &[target.as_str(), "--print", "webpage_url", "--skip-download"],
                self.config.search_timeout,
            )
            .await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|l| l.starts_with("http"))
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_metadata() {
        let info = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "uploader": "Rick Astley",
            "duration": 212.0,
            "is_live": false,
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        });

        let media = media_reference_from_json(&info).unwrap();
        assert_eq!(media.source_kind, SourceKind::DirectStream);
        assert_eq!(media.title, "Never Gonna Give You Up");
        assert_eq!(media.uploader.as_deref(), Some("Rick Astley"));
        assert_eq!(media.duration_seconds, Some(212));
        assert!(!media.is_live);
    }

    #[test]
    fn test_live_stream_has_no_duration() {
        let info = json!({
            "title": "lofi hip hop radio",
            "channel": "Lofi Girl",
            "duration": 0,
            "is_live": true,
            "original_url": "https://www.youtube.com/watch?v=jfKfPfyJRdk"
        });

        let media = media_reference_from_json(&info).unwrap();
        assert!(media.is_live);
        assert_eq!(media.duration_seconds, None);
        assert_eq!(media.uploader.as_deref(), Some("Lofi Girl"));
        assert_eq!(media.canonical_url, "https://www.youtube.com/watch?v=jfKfPfyJRdk");
    }

    #[test]
    fn test_metadata_without_url() {
        let result = media_reference_from_json(&json!({"title": "x"}));
        assert!(matches!(result, Err(ControlError::ResolutionFailed(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_resolution() {
        let ytdlp = YtDlp::new(YtDlpConfig {
            binary: "stream-station-no-such-ytdlp".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            ytdlp.fetch_metadata("https://youtu.be/dQw4w9WgXcQ").await,
            Err(ControlError::ResolutionFailed(_))
        ));
    }
}
