use station_core::RawPlayback;

/// Format string handed to `mpc -f` so the current-song line is tab separated
pub const STATUS_FORMAT: &str = "%title%\t%artist%\t%file%";

/// Parsed output of `mpc -f STATUS_FORMAT status`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MpdStatus {
    pub state: Option<RawPlayback>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub file: Option<String>,
    pub elapsed: Option<f64>,
    pub duration: Option<f64>,
    /// 0-100, `None` when the mixer is disabled (`volume: n/a`)
    pub volume: Option<f64>,
}

/// Parse `m:ss` or `h:mm:ss` into seconds
pub fn parse_clock(value: &str) -> Option<f64> {
    let mut seconds = 0u64;
    for part in value.trim().split(':') {
        seconds = seconds.checked_mul(60)?.checked_add(part.parse::<u64>().ok()?)?;
    }
    Some(seconds as f64)
}

/// Parse the three-part `mpc status` output
///
/// Playing or paused:
/// ```text
/// Time<TAB>Pink Floyd<TAB>music/time.flac
/// [playing] #1/3   0:12/6:53 (2%)
/// volume: 80%   repeat: off   random: off   single: off   consume: off
/// ```
/// Stopped: only the `volume:` line.
pub fn parse_status(output: &str) -> MpdStatus {
    let mut status = MpdStatus {
        state: Some(RawPlayback::Stopped),
        ..Default::default()
    };

    for line in output.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("volume:") {
            status.volume = trimmed
                .strip_prefix("volume:")
                .and_then(|rest| rest.trim_start().split('%').next())
                .and_then(|v| v.trim().parse::<f64>().ok());
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('[') {
            let Some((state, rest)) = rest.split_once(']') else {
                continue;
            };
            status.state = Some(match state {
                "playing" => RawPlayback::Playing,
                "paused" => RawPlayback::Paused,
                _ => RawPlayback::Stopped,
            });

            if let Some(times) = rest.split_whitespace().find(|token| token.contains(':')) {
                if let Some((elapsed, total)) = times.split_once('/') {
                    status.elapsed = parse_clock(elapsed);
                    status.duration = parse_clock(total);
                }
            }
            continue;
        }

        if line.contains('\t') {
            let mut parts = line.split('\t').map(|p| p.trim().to_string());
            status.title = parts.next().filter(|p| !p.is_empty());
            status.artist = parts.next().filter(|p| !p.is_empty());
            status.file = parts.next().filter(|p| !p.is_empty());
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("0:12"), Some(12.0));
        assert_eq!(parse_clock("6:53"), Some(413.0));
        assert_eq!(parse_clock("1:02:03"), Some(3723.0));
        assert_eq!(parse_clock("n/a"), None);
        assert_eq!(parse_clock("18446744073709551615:00"), None);
        assert_eq!(parse_clock("1:18446744073709551615"), None);
    }

    #[test]
    fn test_parse_playing_status() {
        let output = "Time\tPink Floyd\tmusic/time.flac\n\
                      [playing] #1/3   0:12/6:53 (2%)\n\
                      volume: 80%   repeat: off   random: off   single: off   consume: off\n";

        let status = parse_status(output);
        assert_eq!(status.state, Some(RawPlayback::Playing));
        assert_eq!(status.title.as_deref(), Some("Time"));
        assert_eq!(status.artist.as_deref(), Some("Pink Floyd"));
        assert_eq!(status.file.as_deref(), Some("music/time.flac"));
        assert_eq!(status.elapsed, Some(12.0));
        assert_eq!(status.duration, Some(413.0));
        assert_eq!(status.volume, Some(80.0));
    }

    #[test]
    fn test_parse_paused_status_without_tags() {
        let output = "\t\tstream.mp3\n[paused]  #2/2   1:00/2:00 (50%)\nvolume:100%   repeat: on\n";

        let status = parse_status(output);
        assert_eq!(status.state, Some(RawPlayback::Paused));
        assert_eq!(status.title, None);
        assert_eq!(status.file.as_deref(), Some("stream.mp3"));
        assert_eq!(status.volume, Some(100.0));
    }

    #[test]
    fn test_parse_stopped_status() {
        let status = parse_status("volume: n/a   repeat: off   random: off\n");
        assert_eq!(status.state, Some(RawPlayback::Stopped));
        assert_eq!(status.volume, None);
        assert_eq!(status.elapsed, None);
    }
}
