use regex::Regex;
use std::sync::OnceLock;

/// What kind of input a client handed us, before any external lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// A link the metadata extractor and player process understand directly
    DirectSource { url: String },
    /// A single streaming-service track
    StreamingTrack { url: String, track_id: String },
    /// Any other streaming-service link (album, playlist, artist)
    StreamingCollection { url: String },
    /// An http(s) link to a site we do not support
    UnsupportedUrl { url: String },
    /// Anything that is not a link: a song name
    FreeText { query: String },
}

fn youtube_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(?:https?://)?(?:www\.|m\.|music\.)?youtube\.com/watch\?(?:[^\s#]*&)?v=([\w-]+)",
            r"^(?:https?://)?(?:www\.|m\.)?youtube\.com/(?:shorts|embed|live)/([\w-]+)",
            r"^(?:https?://)?youtu\.be/([\w-]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn spotify_track_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(?:(?:https?://)?open\.spotify\.com/(?:intl-[a-z]{2}(?:-[a-z]{2})?/)?track/|spotify:track:)([A-Za-z0-9]+)").ok()
        })
        .as_ref()
}

/// Extract the video id from a YouTube watch, short, embed or youtu.be link
pub fn extract_youtube_id(url: &str) -> Option<String> {
    youtube_patterns()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the track id from an open.spotify.com track link or a `spotify:track:` uri
pub fn extract_spotify_track_id(url: &str) -> Option<String> {
    spotify_track_pattern()?
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// `spotify:track:<id>` uri understood by the desktop client
pub fn spotify_track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

pub fn is_spotify_url(input: &str) -> bool {
    let lower = input.to_lowercase();
    lower.starts_with("spotify:") || lower.contains("open.spotify.com/") || lower.contains("spotify.link/")
}

fn looks_like_url(input: &str) -> bool {
    let lower = input.to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

/// Classify raw user input
pub fn classify_input(input: &str) -> InputKind {
    let input = input.trim();

    if extract_youtube_id(input).is_some() {
        return InputKind::DirectSource { url: input.to_string() };
    }

    if let Some(track_id) = extract_spotify_track_id(input) {
        tracing::debug!("Classified streaming track {}", track_id);
        return InputKind::StreamingTrack {
            url: input.to_string(),
            track_id,
        };
    }

    if is_spotify_url(input) {
        return InputKind::StreamingCollection { url: input.to_string() };
    }

    if looks_like_url(input) {
        return InputKind::UnsupportedUrl { url: input.to_string() };
    }

    InputKind::FreeText { query: input.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_youtube_id() {
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?v=eB3eXQOUvA8").as_deref(),
            Some("eB3eXQOUvA8")
        );
        assert_eq!(
            extract_youtube_id("https://www.youtube.com/watch?list=PL1&v=wJJZUXWde-A").as_deref(),
            Some("wJJZUXWde-A")
        );
        assert_eq!(extract_youtube_id("youtu.be/abc123").as_deref(), Some("abc123"));
        assert_eq!(
            extract_youtube_id("https://youtube.com/embed/xyz_9").as_deref(),
            Some("xyz_9")
        );
        assert_eq!(
            extract_youtube_id("https://music.youtube.com/watch?v=m1").as_deref(),
            Some("m1")
        );
        assert_eq!(extract_youtube_id("https://vimeo.com/123"), None);
    }

    #[test]
    fn test_extract_spotify_track_id() {
        assert_eq!(
            extract_spotify_track_id("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc").as_deref(),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            extract_spotify_track_id("https://open.spotify.com/intl-de/track/4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(
            extract_spotify_track_id("spotify:track:4uLU6hMCjMI75M1A2tKUQC").as_deref(),
            Some("4uLU6hMCjMI75M1A2tKUQC")
        );
        assert_eq!(extract_spotify_track_id("https://open.spotify.com/album/1"), None);
    }

    #[test]
    fn test_classify_input() {
        assert!(matches!(
            classify_input("  https://youtu.be/abc  "),
            InputKind::DirectSource { url } if url == "https://youtu.be/abc"
        ));
        assert!(matches!(
            classify_input("https://open.spotify.com/track/abc"),
            InputKind::StreamingTrack { track_id, .. } if track_id == "abc"
        ));
        assert!(matches!(
            classify_input("https://open.spotify.com/playlist/xyz"),
            InputKind::StreamingCollection { .. }
        ));
        assert!(matches!(
            classify_input("https://soundcloud.com/someone/track"),
            InputKind::UnsupportedUrl { .. }
        ));
        assert_eq!(
            classify_input("comfortably numb pink floyd"),
            InputKind::FreeText { query: "comfortably numb pink floyd".to_string() }
        );
    }

    #[test]
    fn test_spotify_track_uri() {
        assert_eq!(spotify_track_uri("abc"), "spotify:track:abc");
    }
}
