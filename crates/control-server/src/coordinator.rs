//! Control router
//!
//! Owns every registered backend and the canonical session. The coordinator
//! lives behind one async mutex ([`SharedCoordinator`]) so that each command,
//! status polls included, is a single serialized read-modify-write.

use station_core::{
    BackendKind, ControlError, ControlResult, MediaReference, PlaybackBackend, PlayerState,
    SessionState, Volume,
};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedCoordinator = Arc<Mutex<Coordinator>>;

pub struct Coordinator {
    backends: Vec<Box<dyn PlaybackBackend>>,
    session: SessionState,
}

impl Coordinator {
    pub fn new(default_volume: u8) -> Self {
        Self {
            backends: Vec::new(),
            session: SessionState::new(default_volume),
        }
    }

    pub fn into_shared(self) -> SharedCoordinator {
        Arc::new(Mutex::new(self))
    }

    /// Register a backend, replacing any earlier one of the same kind
    pub fn register_backend(&mut self, backend: Box<dyn PlaybackBackend>) {
        let kind = backend.kind();
        self.backends.retain(|b| b.kind() != kind);
        tracing::debug!("Registered {} backend", kind);
        self.backends.push(backend);
    }

    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    fn backend_mut(&mut self, kind: BackendKind) -> ControlResult<&mut Box<dyn PlaybackBackend>> {
        self.backends
            .iter_mut()
            .find(|b| b.kind() == kind)
            .ok_or_else(|| ControlError::AdapterUnavailable(format!("no {} backend configured", kind)))
    }

    fn require_active(&self) -> ControlResult<BackendKind> {
        match self.session.active_backend() {
            BackendKind::None => Err(ControlError::NoActiveSession),
            kind => Ok(kind),
        }
    }

    /// Adapter failures put the session into `Failed`; other errors leave it alone
    fn note_failure(&mut self, error: ControlError) -> ControlError {
        if error.is_adapter_failure() {
            tracing::error!("Backend failure: {}", error);
            self.session.mark_failed();
        }
        error
    }

    /// Re-read the backend and merge its status into the session
    async fn refresh(&mut self, kind: BackendKind) -> PlayerState {
        let raw = match self.backend_mut(kind) {
            Ok(backend) => backend.status().await,
            Err(e) => Err(e),
        };

        match raw {
            Ok(raw) => self.session.apply_raw_status(kind, &raw),
            Err(e) => {
                tracing::warn!("Failed to read {} status: {}", kind, e);
                self.session.snapshot()
            }
        }
    }

    /// Stop every backend other than `target` that holds a session
    ///
    /// A backend that reports no session is already stopped. Any other stop
    /// failure aborts the switch so two backends are never live at once.
    async fn stop_others(&mut self, target: BackendKind) -> ControlResult<()> {
        let active = self.session.active_backend();

        for backend in self.backends.iter_mut().filter(|b| b.kind() != target) {
            let kind = backend.kind();
            if kind != active && !backend.is_running().await {
                continue;
            }

            tracing::info!("Stopping {} backend before starting {}", kind, target);
            match backend.stop().await {
                Ok(()) | Err(ControlError::NoActiveSession) => {}
                Err(e) => {
                    tracing::error!("Failed to stop {} backend, not starting {}: {}", kind, target, e);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Bind `media` to the backend its source kind routes to
    async fn start_media(&mut self, media: &MediaReference) -> ControlResult<PlayerState> {
        let kind = media.source_kind.backend();
        tracing::info!("Starting '{}' on the {} backend", media.title, kind);

        if let Err(e) = self.stop_others(kind).await {
            self.session.mark_failed();
            return Err(e);
        }
        self.session.begin_loading(kind);

        let started = match self.backend_mut(kind) {
            Ok(backend) => backend.start(media).await,
            Err(e) => Err(e),
        };

        if let Err(e) = started {
            if e.is_adapter_failure() {
                tracing::error!("Failed to start {} backend: {}", kind, e);
                self.session.detach_failed();
            } else {
                self.session.reset();
            }
            return Err(e);
        }

        self.session.bind(kind, media);
        Ok(self.refresh(kind).await)
    }

    /// Play new media, or resume the active backend when `media` is `None`
    pub async fn play(&mut self, media: Option<MediaReference>) -> ControlResult<PlayerState> {
        let Some(media) = media else {
            return self.resume().await;
        };
        self.start_media(&media).await
    }

    async fn resume(&mut self) -> ControlResult<PlayerState> {
        let kind = match self.session.active_backend() {
            BackendKind::None => return Err(ControlError::MissingTarget),
            kind => kind,
        };

        let result = self.backend_mut(kind)?.play().await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.recover();
        Ok(self.refresh(kind).await)
    }

    pub async fn pause(&mut self) -> ControlResult<PlayerState> {
        let kind = self.require_active()?;

        let result = self.backend_mut(kind)?.pause().await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.recover();
        Ok(self.refresh(kind).await)
    }

    /// Stop the active backend and reset the session; `LastPlayed` survives
    pub async fn stop(&mut self) -> ControlResult<PlayerState> {
        let kind = self.require_active()?;

        let result = self.backend_mut(kind)?.stop().await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.reset();
        tracing::info!("Stopped {} backend", kind);
        Ok(self.session.snapshot())
    }

    /// Restart the last played media from the beginning
    ///
    /// Direct sources always replay through the process backend; library and
    /// streaming items go back to the backend they came from.
    pub async fn replay(&mut self) -> ControlResult<PlayerState> {
        let last = self
            .session
            .last_played()
            .cloned()
            .ok_or(ControlError::NothingToReplay)?;

        let media = MediaReference {
            source_kind: last.source_kind,
            canonical_url: last.canonical_url,
            title: last.title,
            uploader: None,
            duration_seconds: None,
            is_live: false,
        };

        self.start_media(&media).await?;
        self.session.mark_replay();
        Ok(self.session.snapshot())
    }

    pub async fn set_volume(&mut self, volume: i64) -> ControlResult<PlayerState> {
        let volume = Volume::new(volume)?;
        let kind = self.require_active()?;

        let result = self.backend_mut(kind)?.set_volume(volume).await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.recover();
        Ok(self.refresh(kind).await)
    }

    /// Ordered navigation only exists on the media bus
    fn require_navigation(&self, operation: &'static str) -> ControlResult<BackendKind> {
        match self.session.active_backend() {
            BackendKind::Bus => Ok(BackendKind::Bus),
            _ => Err(ControlError::UnsupportedOperation(operation)),
        }
    }

    pub async fn next(&mut self) -> ControlResult<PlayerState> {
        let kind = self.require_navigation("next")?;

        let result = self.backend_mut(kind)?.next().await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.recover();
        Ok(self.refresh(kind).await)
    }

    pub async fn previous(&mut self) -> ControlResult<PlayerState> {
        let kind = self.require_navigation("previous")?;

        let result = self.backend_mut(kind)?.previous().await;
        result.map_err(|e| self.note_failure(e))?;

        self.session.recover();
        Ok(self.refresh(kind).await)
    }

    /// Best-effort refresh from the active backend; never fails
    pub async fn status(&mut self) -> PlayerState {
        let kind = self.session.active_backend();
        if kind == BackendKind::None {
            return self.session.snapshot();
        }

        let running = match self.backend_mut(kind) {
            Ok(backend) => backend.is_running().await,
            Err(_) => false,
        };

        if !running {
            tracing::info!("{} backend no longer has a session, resetting", kind);
            self.session.reset();
            return self.session.snapshot();
        }

        self.refresh(kind).await
    }
}
