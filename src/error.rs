use std::time::Duration;
use thiserror::Error;

/// Errors returned synchronously by orchestrator operations.
///
/// Each variant maps to a stable machine-readable code so clients can
/// branch on failures without parsing messages.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Client-supplied session config is missing required fields or out of range
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    /// No session with this identifier exists
    #[error("session {0} not found")]
    SessionNotFound(String),

    /// The session exists but is past the point of accepting this operation
    #[error("session {0} is no longer accepting audio")]
    SessionNotActive(String),

    /// Push attempted after the channel's terminal marker
    #[error("session channel is closed")]
    ChannelClosed,
}

impl OrchestratorError {
    /// Stable error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidConfig(_) => "invalid_config",
            OrchestratorError::SessionNotFound(_) => "session_not_found",
            OrchestratorError::SessionNotActive(_) => "session_not_active",
            OrchestratorError::ChannelClosed => "channel_closed",
        }
    }
}

impl From<ChannelClosed> for OrchestratorError {
    fn from(_: ChannelClosed) -> Self {
        OrchestratorError::ChannelClosed
    }
}

/// The peer side of a session channel is gone or the channel was closed.
#[derive(Debug, Error)]
#[error("channel closed")]
pub struct ChannelClosed;

/// Failures reported by (or while talking to) the recognition engine.
///
/// These never cross a task boundary as errors; the bridge converts them
/// into a single `Error` result event.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("recognition quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("engine rejected audio: {0}")]
    InvalidAudio(String),

    #[error("engine deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("engine connection reset: {0}")]
    ConnectionReset(String),

    #[error("no engine response within {0:?}")]
    Timeout(Duration),

    #[error("engine failure: {0}")]
    Failed(String),
}

impl EngineError {
    /// Stable error code carried in `Error` result events.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::QuotaExceeded(_) => "quota_exceeded",
            EngineError::InvalidAudio(_) => "invalid_audio",
            EngineError::DeadlineExceeded(_) => "deadline_exceeded",
            EngineError::ConnectionReset(_) => "connection_reset",
            EngineError::Timeout(_) => "engine_timeout",
            EngineError::Failed(_) => "engine_error",
        }
    }

    /// Map an engine-reported wire code back to a variant.
    pub fn from_wire(code: &str, message: String) -> Self {
        match code {
            "quota_exceeded" => EngineError::QuotaExceeded(message),
            "invalid_audio" => EngineError::InvalidAudio(message),
            "deadline_exceeded" => EngineError::DeadlineExceeded(message),
            "connection_reset" => EngineError::ConnectionReset(message),
            _ => EngineError::Failed(message),
        }
    }
}
