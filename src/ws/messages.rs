use serde::{Deserialize, Serialize};

use crate::session::{EventKind, RecognitionEvent, StreamingConfig};

/// Inbound client messages, tagged by `type`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new streaming session on this connection
    StartSession {
        #[serde(default)]
        config: StreamingConfig,
    },
    /// One chunk of audio, base64-encoded; sequence is advisory
    AudioChunk {
        data: String,
        #[serde(default)]
        sequence: u64,
    },
    /// End the connection's session and flush remaining results
    EndSession,
}

/// Outbound server messages, tagged by `type`
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionStarted {
        session_id: String,
    },
    InterimResult {
        session_id: String,
        text: String,
        confidence: f32,
    },
    FinalResult {
        session_id: String,
        text: String,
        confidence: f32,
    },
    SessionEnded {
        session_id: String,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        error_code: String,
        error_message: String,
    },
}

impl ServerMessage {
    /// Map a drained recognition event to its wire message.
    /// `EndOfStream` has no client-facing message; session end is reported
    /// separately via `SessionEnded`.
    pub fn from_event(event: RecognitionEvent) -> Option<Self> {
        let session_id = event.session_id;
        match event.kind {
            EventKind::Interim { text, confidence } => Some(ServerMessage::InterimResult {
                session_id,
                text,
                confidence,
            }),
            EventKind::Final { text, confidence } => Some(ServerMessage::FinalResult {
                session_id,
                text,
                confidence,
            }),
            EventKind::Error { code, message } => Some(ServerMessage::Error {
                session_id: Some(session_id),
                error_code: code,
                error_message: message,
            }),
            EventKind::EndOfStream => None,
        }
    }
}
