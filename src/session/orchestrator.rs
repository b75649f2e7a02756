use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::channel::ResultReceiver;
use super::config::StreamingConfig;
use super::event::{AudioFragment, RecognitionEvent};
use super::registry::SessionRegistry;
use super::session::{Session, SessionState};
use crate::engine::bridge::{self, BridgeTimeouts};
use crate::engine::RecognitionEngine;
use crate::error::OrchestratorError;

/// Tunables for the orchestrator and the bridges it spawns.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Audio fragments buffered per session before `submit_audio` suspends
    pub audio_queue_depth: usize,
    /// Result events buffered per session before the bridge suspends
    pub result_queue_depth: usize,
    /// How long `end_session` waits for the bridge to drain before a hard abort
    pub drain_timeout: Duration,
    /// How long the bridge waits for the engine to accept a stream
    pub engine_connect_timeout: Duration,
    /// How long the bridge waits for the engine's first response
    pub engine_first_result_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            audio_queue_depth: 32,
            result_queue_depth: 64,
            drain_timeout: Duration::from_secs(5),
            engine_connect_timeout: Duration::from_secs(10),
            engine_first_result_timeout: Duration::from_secs(15),
        }
    }
}

/// Top-level coordinator for streaming transcription sessions.
///
/// Creates sessions, wires their channels to a recognition bridge running
/// as its own task, enforces the Active → Closing → Closed state machine,
/// and tears sessions down in order: audio channel closed first, bridge
/// drained within a bounded timeout, hard abort as the fallback.
pub struct SessionOrchestrator {
    registry: SessionRegistry,
    engine: Arc<dyn RecognitionEngine>,
    config: OrchestratorConfig,
}

impl SessionOrchestrator {
    pub fn new(engine: Arc<dyn RecognitionEngine>, config: OrchestratorConfig) -> Self {
        Self {
            registry: SessionRegistry::new(),
            engine,
            config,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Validate the config, create the session, and spawn its bridge.
    ///
    /// Validation runs before anything is allocated, so a rejected start
    /// leaves no partial session behind.
    pub async fn start_session(
        &self,
        config: StreamingConfig,
    ) -> Result<String, OrchestratorError> {
        config.validate().map_err(OrchestratorError::InvalidConfig)?;

        let (session, wiring) = self
            .registry
            .create(
                config,
                self.config.audio_queue_depth,
                self.config.result_queue_depth,
            )
            .await;

        let timeouts = BridgeTimeouts {
            engine_connect: self.config.engine_connect_timeout,
            first_result: self.config.engine_first_result_timeout,
        };
        let bridge = tokio::spawn(bridge::run(
            Arc::clone(&self.engine),
            Arc::clone(&session),
            wiring.audio_rx,
            wiring.result_tx,
            timeouts,
        ));
        let abort = bridge.abort_handle();
        let supervisor = tokio::spawn(supervise(Arc::clone(&session), bridge));
        session.attach_bridge(supervisor, abort).await;

        info!(
            "session {} started ({}, {} Hz, {})",
            session.id, session.config.language, session.config.sample_rate, session.config.encoding
        );
        Ok(session.id.clone())
    }

    /// Queue one audio fragment for the session's bridge.
    ///
    /// Only valid while the session is `Active`. Suspends when the audio
    /// queue is full; that backpressure is what keeps a fast client from
    /// outrunning a slow engine.
    pub async fn submit_audio(
        &self,
        session_id: &str,
        data: Vec<u8>,
        sequence: u64,
    ) -> Result<(), OrchestratorError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        if session.state().await != SessionState::Active {
            return Err(OrchestratorError::SessionNotActive(session_id.to_string()));
        }

        let arrival = session.next_audio_seq();
        if sequence != arrival {
            // Advisory only: worth a log line, never a reorder
            debug!(
                "session {}: client sequence {} at arrival {} (gap or duplicate)",
                session_id, sequence, arrival
            );
        }
        session.touch().await;

        session
            .audio_tx()
            .push(AudioFragment { data, sequence })
            .await?;
        Ok(())
    }

    /// Close the session's audio channel and wait for the bridge to drain.
    ///
    /// Valid in `Active` or `Closing` (idempotent). If the bridge has not
    /// finished within the drain timeout it is aborted, which drops the
    /// engine stream and releases its network resources. Either way the
    /// session ends up `Closed` and out of the registry.
    pub async fn end_session(&self, session_id: &str) -> Result<(), OrchestratorError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        let prior = session.begin_close().await;
        if prior == SessionState::Active {
            info!("session {} closing", session_id);
        }
        session.audio_tx().close().await;

        let Some(mut supervisor) = session.take_supervisor().await else {
            // Another end_session call claimed the drain; nothing left to do
            debug!("session {}: teardown already in progress", session_id);
            return Ok(());
        };

        match timeout(self.config.drain_timeout, &mut supervisor).await {
            Ok(joined) => {
                if let Err(e) = joined {
                    error!("session {}: supervisor task failed: {}", session_id, e);
                }
            }
            Err(_) => {
                warn!(
                    "session {}: bridge still draining after {:?}, aborting",
                    session_id, self.config.drain_timeout
                );
                session.abort_bridge().await;
                if let Err(e) = supervisor.await {
                    error!("session {}: supervisor task failed: {}", session_id, e);
                }
            }
        }

        session.finish_close().await;
        self.registry.remove(session_id).await;
        info!("session {} closed", session_id);
        Ok(())
    }

    /// Lazily consume result events for a session, up to `EndOfStream`.
    ///
    /// Each call continues from the current position; a drain dropped
    /// mid-stream loses nothing except its own place in line. An abandoned
    /// drain never blocks `end_session`: the bridge fails fast once the
    /// session's receiver is gone.
    pub async fn drain_results(
        &self,
        session_id: &str,
    ) -> Result<ResultDrain, OrchestratorError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| OrchestratorError::SessionNotFound(session_id.to_string()))?;

        let rx = session.results().lock_owned().await;
        Ok(ResultDrain { rx, finished: false })
    }
}

/// Observe the bridge task's termination, however it ends.
///
/// A bridge that returns (or panics, or is aborted) while the session is
/// still `Active` must not leave it accepting audio into a dead channel,
/// so the supervisor forces the transition to `Closing`.
async fn supervise(session: Arc<Session>, bridge: JoinHandle<()>) {
    match bridge.await {
        Ok(()) => debug!("session {}: bridge finished", session.id),
        Err(e) if e.is_cancelled() => debug!("session {}: bridge cancelled", session.id),
        Err(e) => error!("session {}: bridge panicked: {}", session.id, e),
    }

    if session.begin_close().await == SessionState::Active {
        warn!(
            "session {}: bridge exited while the session was active",
            session.id
        );
        session.audio_tx().close().await;
    }
}

/// Live view over a session's result events, ending at `EndOfStream`.
pub struct ResultDrain {
    rx: OwnedMutexGuard<ResultReceiver>,
    finished: bool,
}

impl ResultDrain {
    /// Next event in production order, or `None` once the stream has
    /// terminated.
    pub async fn next(&mut self) -> Option<RecognitionEvent> {
        if self.finished {
            return None;
        }
        match self.rx.recv().await {
            Some(event) => {
                if event.is_end_of_stream() {
                    self.finished = true;
                }
                Some(event)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}
