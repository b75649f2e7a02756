use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle};

use super::channel::{channel, AudioReceiver, AudioSender, ResultReceiver, ResultSender};
use super::config::StreamingConfig;

/// Lifecycle state of a streaming session.
///
/// `Active`: accepting audio, bridge running.
/// `Closing`: end-of-input signaled or transport gone; audio channel
/// closed, remaining results draining.
/// `Closed`: terminal; the session is removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closing,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "active",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
        }
    }
}

/// The channel ends handed to the recognition bridge when a session is
/// created: it consumes audio and produces results.
pub struct SessionWiring {
    pub audio_rx: AudioReceiver,
    pub result_tx: ResultSender,
}

/// One client's end-to-end streaming transcription interaction.
///
/// Owned by the orchestrator through the registry; the bridge and the
/// drain path hold the same `Arc`, so there is never a second copy of the
/// session record that could diverge.
pub struct Session {
    pub id: String,
    pub config: StreamingConfig,
    pub created_at: DateTime<Utc>,

    state: RwLock<SessionState>,
    last_activity: RwLock<DateTime<Utc>>,

    /// Fragments accepted so far (arrival order, 0-based)
    audio_seq: AtomicU64,
    /// Result events produced so far (0-based)
    result_seq: AtomicU64,

    audio_tx: AudioSender,
    results: Arc<Mutex<ResultReceiver>>,

    supervisor: Mutex<Option<JoinHandle<()>>>,
    bridge_abort: Mutex<Option<AbortHandle>>,
}

impl Session {
    pub(crate) fn new(
        id: String,
        config: StreamingConfig,
        audio_depth: usize,
        result_depth: usize,
    ) -> (Arc<Self>, SessionWiring) {
        let (audio_tx, audio_rx) = channel(audio_depth);
        let (result_tx, result_rx) = channel(result_depth);
        let now = Utc::now();

        let session = Arc::new(Self {
            id,
            config,
            created_at: now,
            state: RwLock::new(SessionState::Active),
            last_activity: RwLock::new(now),
            audio_seq: AtomicU64::new(0),
            result_seq: AtomicU64::new(0),
            audio_tx,
            results: Arc::new(Mutex::new(result_rx)),
            supervisor: Mutex::new(None),
            bridge_abort: Mutex::new(None),
        });

        (session, SessionWiring { audio_rx, result_tx })
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.read().await
    }

    pub async fn touch(&self) {
        *self.last_activity.write().await = Utc::now();
    }

    /// Arrival index for the next audio fragment.
    pub(crate) fn next_audio_seq(&self) -> u64 {
        self.audio_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Sequence for the next result event. Strictly increasing per session.
    pub(crate) fn next_result_seq(&self) -> u64 {
        self.result_seq.fetch_add(1, Ordering::SeqCst)
    }

    pub fn audio_fragments(&self) -> u64 {
        self.audio_seq.load(Ordering::SeqCst)
    }

    pub(crate) fn audio_tx(&self) -> &AudioSender {
        &self.audio_tx
    }

    pub(crate) fn results(&self) -> Arc<Mutex<ResultReceiver>> {
        Arc::clone(&self.results)
    }

    pub(crate) async fn attach_bridge(&self, supervisor: JoinHandle<()>, abort: AbortHandle) {
        *self.supervisor.lock().await = Some(supervisor);
        *self.bridge_abort.lock().await = Some(abort);
    }

    /// Claim the supervisor handle. Only the caller that gets it performs
    /// the drain wait and removal; later callers see `None`.
    pub(crate) async fn take_supervisor(&self) -> Option<JoinHandle<()>> {
        self.supervisor.lock().await.take()
    }

    /// Hard-cancel the bridge task. Used only after the drain timeout.
    pub(crate) async fn abort_bridge(&self) {
        if let Some(abort) = self.bridge_abort.lock().await.take() {
            abort.abort();
        }
    }

    /// Move `Active` to `Closing`; returns the state observed before the
    /// transition so callers can tell who got there first.
    pub(crate) async fn begin_close(&self) -> SessionState {
        let mut state = self.state.write().await;
        let prior = *state;
        if prior == SessionState::Active {
            *state = SessionState::Closing;
        }
        prior
    }

    pub(crate) async fn finish_close(&self) {
        *self.state.write().await = SessionState::Closed;
    }
}
