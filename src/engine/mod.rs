//! Recognition engine interface and implementations
//!
//! The engine is an external collaborator reached through one narrow call
//! shape: hand it a receiver of raw audio chunks, get back a receiver of
//! recognition events. `nats` holds the production implementation;
//! `bridge` is the per-session task that drives whichever engine is
//! plugged in.

pub mod bridge;
pub mod messages;
pub mod nats;

use tokio::sync::mpsc;

use crate::error::EngineError;
use crate::session::StreamingConfig;

pub use nats::NatsEngine;

/// A single recognition hypothesis. Engines return N-best lists; only the
/// top alternative is ever surfaced to clients.
#[derive(Debug, Clone)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f32,
}

/// One item in an engine's native response stream.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A hypothesis set, provisional or final
    Result {
        alternatives: Vec<Alternative>,
        is_final: bool,
    },
    /// Terminal failure; the engine produces nothing after this
    Error(EngineError),
}

/// Streaming recognition engine.
///
/// `open_stream` starts one recognition stream for one session: the engine
/// consumes raw audio chunks from `audio` (the channel closing means there
/// is no more input) and the returned receiver yields its events (the
/// channel closing means the engine has no more output). Streams are not
/// resumable; a failed stream is reported through an `EngineEvent::Error`
/// and a fresh session gets a fresh stream.
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn open_stream(
        &self,
        session_id: &str,
        config: &StreamingConfig,
        audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineError>;

    /// Engine name for logging
    fn name(&self) -> &str;
}
