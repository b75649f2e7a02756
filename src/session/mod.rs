//! Streaming session core
//!
//! Everything a live transcription session is made of:
//! - `SessionRegistry`: the process-wide table of active sessions
//! - bounded audio/result channels with explicit end-of-stream marking
//! - `Session`: per-session record and Active → Closing → Closed states
//! - `SessionOrchestrator`: start/submit/end/drain operations and the
//!   per-session bridge task lifecycle

mod channel;
mod config;
mod event;
mod orchestrator;
mod registry;
mod session;

pub use channel::{
    channel, AudioReceiver, AudioSender, ChannelReceiver, ChannelSender, ResultReceiver,
    ResultSender,
};
pub use config::{StreamingConfig, SUPPORTED_SAMPLE_RATES};
pub use event::{AudioFragment, EventKind, RecognitionEvent};
pub use orchestrator::{OrchestratorConfig, ResultDrain, SessionOrchestrator};
pub use registry::SessionRegistry;
pub use session::{Session, SessionState, SessionWiring};
