pub mod config;
pub mod engine;
pub mod error;
pub mod session;
pub mod ws;

pub use config::Config;
pub use engine::{Alternative, EngineEvent, NatsEngine, RecognitionEngine};
pub use error::{ChannelClosed, EngineError, OrchestratorError};
pub use session::{
    AudioFragment, EventKind, OrchestratorConfig, RecognitionEvent, ResultDrain, Session,
    SessionOrchestrator, SessionRegistry, SessionState, StreamingConfig,
};
pub use ws::{create_router, AppState, ClientMessage, ServerMessage};
