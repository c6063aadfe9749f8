//! Error taxonomy shared by the resolver, the adapters and the control router

/// Result type alias for control operations
pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Everything a control command can fail with
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Metadata extraction or search exited with an error
    #[error("Failed to resolve media: {0}")]
    ResolutionFailed(String),

    /// Metadata extraction or search hit its time ceiling
    #[error("Timed out after {0}s while resolving media")]
    ResolutionTimeout(u64),

    /// A search ran but produced nothing playable
    #[error("No match found for '{0}'")]
    NoMatchFound(String),

    /// The streaming-service integration has no usable token
    #[error("Streaming service is not authenticated")]
    NotAuthenticated,

    /// Input is a link to a source the station cannot play or download
    #[error("Unsupported media source: {0}")]
    UnsupportedSource(String),

    /// A play request carried a body but nothing to play
    #[error("Media URL or song name is required")]
    MissingTarget,

    /// The request body could not be read as the expected JSON
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// Replay was requested before anything was ever played
    #[error("Nothing has been played yet")]
    NothingToReplay,

    /// The binary or daemon controlling a backend cannot be reached
    #[error("Backend unavailable: {0}")]
    AdapterUnavailable(String),

    /// The command needs a live backend session and there is none
    #[error("No media is currently loaded")]
    NoActiveSession,

    #[error("Volume must be between 0 and 150 (got {0})")]
    InvalidVolume(i64),

    /// The active backend cannot perform this operation
    #[error("Operation not supported by the active backend: {0}")]
    UnsupportedOperation(&'static str),

    /// Unrecoverable backend failure
    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl ControlError {
    /// HTTP status code the control surface answers with
    pub fn status_code(&self) -> u16 {
        match self {
            ControlError::MissingTarget
            | ControlError::InvalidRequest(_)
            | ControlError::UnsupportedSource(_)
            | ControlError::NothingToReplay
            | ControlError::NoActiveSession
            | ControlError::InvalidVolume(_) => 400,
            ControlError::NotAuthenticated => 403,
            ControlError::ResolutionFailed(_)
            | ControlError::ResolutionTimeout(_)
            | ControlError::NoMatchFound(_) => 404,
            ControlError::UnsupportedOperation(_) => 501,
            ControlError::AdapterUnavailable(_) | ControlError::Backend(_) => 500,
        }
    }

    /// Errors that put the session into the failed state
    ///
    /// Validation and resolution errors are answered without touching playback.
    pub fn is_adapter_failure(&self) -> bool {
        matches!(self, ControlError::AdapterUnavailable(_) | ControlError::Backend(_))
    }

    /// Short machine-readable name, used as the `error` field of responses
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::ResolutionFailed(_) => "resolution_failed",
            ControlError::ResolutionTimeout(_) => "resolution_timeout",
            ControlError::NoMatchFound(_) => "no_match_found",
            ControlError::NotAuthenticated => "not_authenticated",
            ControlError::UnsupportedSource(_) => "unsupported_source",
            ControlError::MissingTarget => "missing_target",
            ControlError::InvalidRequest(_) => "invalid_request",
            ControlError::NothingToReplay => "nothing_to_replay",
            ControlError::AdapterUnavailable(_) => "adapter_unavailable",
            ControlError::NoActiveSession => "no_active_session",
            ControlError::InvalidVolume(_) => "invalid_volume",
            ControlError::UnsupportedOperation(_) => "unsupported_operation",
            ControlError::Backend(_) => "backend_error",
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(anyhow::anyhow!(msg.into()))
    }
}
