//! WebSocket transport for streaming transcription
//!
//! Thin glue between the connection and the orchestrator:
//! - `start_session` / `audio_chunk` / `end_session` inbound messages
//! - `session_started` / `interim_result` / `final_result` /
//!   `session_ended` / `error` outbound messages
//! - GET /health - liveness plus active-session count

mod handler;
mod messages;
mod routes;
mod state;

pub use messages::{ClientMessage, ServerMessage};
pub use routes::create_router;
pub use state::AppState;
