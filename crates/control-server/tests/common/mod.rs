#![allow(dead_code)]

use async_trait::async_trait;
use station_control::{Coordinator, SharedCoordinator, Station};
use station_core::*;
use station_downloads::{AudioFetcher, DownloadPipeline, ProgressReporter, StreamingDownloader};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Call log shared by every mock so ordering across backends can be asserted
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Observable state of a mock backend, kept outside the boxed backend
#[derive(Default)]
pub struct MockHandle {
    pub bound: Mutex<Option<String>>,
    pub paused: Mutex<bool>,
    pub volume: Mutex<Option<u8>>,
    pub fail_commands: Mutex<bool>,
}

impl MockHandle {
    pub fn bound(&self) -> Option<String> {
        self.bound.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        *self.fail_commands.lock().unwrap() = fail;
    }
}

pub struct MockBackend {
    kind: BackendKind,
    log: CallLog,
    handle: Arc<MockHandle>,
    start_delay: Duration,
}

impl MockBackend {
    pub fn new(kind: BackendKind, log: CallLog) -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (
            Self {
                kind,
                log,
                handle: handle.clone(),
                start_delay: Duration::ZERO,
            },
            handle,
        )
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(format!("{}:{}", self.kind, call));
    }

    fn check(&self) -> ControlResult<()> {
        if *self.handle.fail_commands.lock().unwrap() {
            return Err(ControlError::backend(format!("{} exploded", self.kind)));
        }
        if self.handle.bound().is_none() {
            return Err(ControlError::NoActiveSession);
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn start(&mut self, media: &MediaReference) -> ControlResult<()> {
        self.record(&format!("start {}", media.canonical_url));
        if *self.handle.fail_commands.lock().unwrap() {
            return Err(ControlError::AdapterUnavailable(format!("{} missing", self.kind)));
        }
        tokio::time::sleep(self.start_delay).await;
        *self.handle.bound.lock().unwrap() = Some(media.canonical_url.clone());
        *self.handle.paused.lock().unwrap() = false;
        Ok(())
    }

    async fn play(&mut self) -> ControlResult<()> {
        self.record("play");
        self.check()?;
        *self.handle.paused.lock().unwrap() = false;
        Ok(())
    }

    async fn pause(&mut self) -> ControlResult<()> {
        self.record("pause");
        self.check()?;
        *self.handle.paused.lock().unwrap() = true;
        Ok(())
    }

    async fn stop(&mut self) -> ControlResult<()> {
        self.record("stop");
        self.check()?;
        *self.handle.bound.lock().unwrap() = None;
        Ok(())
    }

    async fn set_volume(&mut self, volume: Volume) -> ControlResult<()> {
        self.record(&format!("volume {}", volume.get()));
        self.check()?;
        *self.handle.volume.lock().unwrap() = Some(volume.get());
        Ok(())
    }

    /// Reports in the backend's native units
    async fn status(&mut self) -> ControlResult<RawStatus> {
        self.check()?;
        let paused = *self.handle.paused.lock().unwrap();
        let volume = self.handle.volume.lock().unwrap().map(|v| match self.kind {
            BackendKind::Bus => f64::from(v) / 100.0,
            _ => f64::from(v),
        });
        let (position, duration) = match self.kind {
            BackendKind::Bus => (Some(5_000_000.0), Some(200_000_000.0)),
            _ => (Some(5.0), Some(200.0)),
        };

        Ok(RawStatus {
            playback: if paused { RawPlayback::Paused } else { RawPlayback::Playing },
            volume,
            position,
            duration,
            title: None,
            artist: None,
            url: self.handle.bound(),
        })
    }

    async fn is_running(&mut self) -> bool {
        self.handle.bound().is_some()
    }

    async fn next(&mut self) -> ControlResult<()> {
        if self.kind != BackendKind::Bus {
            return Err(ControlError::UnsupportedOperation("next"));
        }
        self.record("next");
        self.check()
    }

    async fn previous(&mut self) -> ControlResult<()> {
        if self.kind != BackendKind::Bus {
            return Err(ControlError::UnsupportedOperation("previous"));
        }
        self.record("previous");
        self.check()
    }
}

/// Resolver answering from a fixed table; unknown input is an unauthenticated streaming link
pub struct MockResolver {
    references: HashMap<String, MediaReference>,
    log: CallLog,
}

impl MockResolver {
    pub fn new(log: CallLog) -> Self {
        let mut references = HashMap::new();
        for (input, kind, title) in [
            ("https://youtu.be/first", SourceKind::DirectStream, "First Video"),
            ("https://youtu.be/second", SourceKind::DirectStream, "Second Video"),
            ("comfortably numb", SourceKind::LibraryQuery, "comfortably numb"),
            ("spotify:track:native", SourceKind::StreamingService, "Native Track"),
        ] {
            references.insert(
                input.to_string(),
                MediaReference {
                    source_kind: kind,
                    canonical_url: input.to_string(),
                    title: title.to_string(),
                    uploader: Some("Uploader".to_string()),
                    duration_seconds: Some(200),
                    is_live: false,
                },
            );
        }
        Self { references, log }
    }
}

#[async_trait]
impl MediaResolver for MockResolver {
    async fn resolve(&self, input: &str) -> ControlResult<MediaReference> {
        self.log.lock().unwrap().push(format!("resolve {}", input));
        if is_spotify_url(input) && !self.references.contains_key(input) {
            return Err(ControlError::NotAuthenticated);
        }
        self.references
            .get(input)
            .cloned()
            .ok_or_else(|| ControlError::NoMatchFound(input.to_string()))
    }
}

pub struct NoopFetcher;

#[async_trait]
impl AudioFetcher for NoopFetcher {
    async fn fetch(&self, _url: &str, _progress: &ProgressReporter) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct Harness {
    pub log: CallLog,
    pub process: Arc<MockHandle>,
    pub daemon: Arc<MockHandle>,
    pub bus: Arc<MockHandle>,
    pub coordinator: SharedCoordinator,
    pub station: Arc<Station>,
}

/// A station wired to one mock per backend kind
pub fn harness() -> Harness {
    harness_with_delay(Duration::ZERO)
}

pub fn harness_with_delay(start_delay: Duration) -> Harness {
    let log: CallLog = Arc::new(Mutex::new(Vec::new()));
    let mut coordinator = Coordinator::new(DEFAULT_VOLUME);

    let (process, process_handle) = MockBackend::new(BackendKind::Process, log.clone());
    let (daemon, daemon_handle) = MockBackend::new(BackendKind::Daemon, log.clone());
    let (bus, bus_handle) = MockBackend::new(BackendKind::Bus, log.clone());
    coordinator.register_backend(Box::new(process.with_start_delay(start_delay)));
    coordinator.register_backend(Box::new(daemon.with_start_delay(start_delay)));
    coordinator.register_backend(Box::new(bus.with_start_delay(start_delay)));

    let coordinator = coordinator.into_shared();
    let station = Arc::new(Station::new(
        Arc::new(MockResolver::new(log.clone())),
        coordinator.clone(),
        DownloadPipeline::start(Arc::new(NoopFetcher)),
        StreamingDownloader::new("stream-station-no-such-spotdl", std::env::temp_dir()),
    ));

    Harness {
        log,
        process: process_handle,
        daemon: daemon_handle,
        bus: bus_handle,
        coordinator,
        station,
    }
}
