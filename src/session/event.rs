use chrono::{DateTime, Utc};

/// One chunk of raw audio submitted by the client.
///
/// The sequence number is the client's own and is advisory: gaps and
/// duplicates are logged for diagnostics, but fragments are always fed to
/// the engine in arrival order, never reordered.
#[derive(Debug, Clone)]
pub struct AudioFragment {
    pub data: Vec<u8>,
    pub sequence: u64,
}

/// A recognition event flowing from the bridge toward delivery.
#[derive(Debug, Clone)]
pub struct RecognitionEvent {
    pub session_id: String,
    /// Monotonically increasing per-session result sequence
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Provisional transcription that may still be revised
    Interim { text: String, confidence: f32 },
    /// Transcription the engine will not revise further
    Final { text: String, confidence: f32 },
    /// Terminal engine failure; nothing but `EndOfStream` follows it
    Error { code: String, message: String },
    /// No more events will be produced for this session
    EndOfStream,
}

impl RecognitionEvent {
    pub fn new(session_id: String, sequence: u64, kind: EventKind) -> Self {
        Self {
            session_id,
            sequence,
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.kind, EventKind::EndOfStream)
    }
}
