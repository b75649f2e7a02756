use serde::{Deserialize, Serialize};

/// Announces a new recognition stream; published once before any audio.
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamBeginMessage {
    pub session_id: String,
    pub language: String,
    pub sample_rate: u32,
    pub encoding: String,
    pub model: String,
    pub punctuation: bool,
    pub interim_results: bool,
    pub timestamp: String, // RFC3339
}

/// Audio frame published to the engine
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamAudioMessage {
    pub session_id: String,
    /// Gateway-side frame counter (arrival order)
    pub sequence: u64,
    pub audio: String, // Base64-encoded raw bytes
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Result message received from the engine
#[derive(Debug, Serialize, Deserialize)]
pub struct StreamResultMessage {
    pub session_id: String,
    /// N-best hypotheses, best first; empty on pure control messages
    #[serde(default)]
    pub alternatives: Vec<AlternativeMessage>,
    #[serde(default)]
    pub is_final: bool,
    /// Set on the engine's last message for this stream
    #[serde(default, rename = "end")]
    pub end_of_stream: bool,
    #[serde(default)]
    pub error: Option<StreamErrorMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AlternativeMessage {
    pub transcript: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamErrorMessage {
    pub code: String,
    pub message: String,
}
