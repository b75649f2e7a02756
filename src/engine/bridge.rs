use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{EngineEvent, RecognitionEngine};
use crate::error::EngineError;
use crate::session::{AudioReceiver, EventKind, RecognitionEvent, ResultSender, Session};

#[derive(Debug, Clone, Copy)]
pub struct BridgeTimeouts {
    /// Deadline for the engine to accept a new stream
    pub engine_connect: Duration,
    /// Deadline for the engine's first response once the stream is open
    pub first_result: Duration,
}

/// Drive one session's recognition stream, start to finish.
///
/// Runs as its own task, exactly one per session. Audio is forwarded in
/// arrival order; engine responses become result events tagged with a
/// strictly increasing sequence. However the stream ends (engine refusal,
/// mid-stream error, timeout, or normal completion), the result channel
/// tells the story and then closes; nothing is ever thrown past this task.
pub async fn run(
    engine: Arc<dyn RecognitionEngine>,
    session: Arc<Session>,
    mut audio: AudioReceiver,
    results: ResultSender,
    timeouts: BridgeTimeouts,
) {
    let session_id = session.id.clone();

    // Engine-side audio feed, decoupled from the client-facing channel so
    // dropping the engine never tears the session's own queue down with it
    let (engine_tx, engine_rx) = mpsc::channel::<Vec<u8>>(1);

    let opened = timeout(
        timeouts.engine_connect,
        engine.open_stream(&session_id, &session.config, engine_rx),
    )
    .await;
    let mut events = match opened {
        Ok(Ok(events)) => events,
        Ok(Err(e)) => {
            warn!("session {}: engine refused stream: {}", session_id, e);
            emit_error(&session, &results, &e).await;
            finish(&session, &results).await;
            return;
        }
        Err(_) => {
            warn!(
                "session {}: engine did not accept the stream within {:?}",
                session_id, timeouts.engine_connect
            );
            let e = EngineError::Timeout(timeouts.engine_connect);
            emit_error(&session, &results, &e).await;
            finish(&session, &results).await;
            return;
        }
    };

    debug!("session {}: stream open via {}", session_id, engine.name());

    // Forward fragments until the audio channel's terminal marker
    let forward_id = session_id.clone();
    let forwarder = tokio::spawn(async move {
        let mut forwarded: u64 = 0;
        while let Some(fragment) = audio.recv().await {
            if engine_tx.send(fragment.data).await.is_err() {
                warn!("session {}: engine stopped accepting audio", forward_id);
                break;
            }
            forwarded += 1;
        }
        debug!(
            "session {}: audio forwarding done ({} fragments)",
            forward_id, forwarded
        );
        // engine_tx drops here, closing the engine's audio feed
    });

    // Read engine events; only the first one is held to the response deadline
    let mut first = true;
    loop {
        let next = if first {
            match timeout(timeouts.first_result, events.recv()).await {
                Ok(item) => item,
                Err(_) => {
                    warn!(
                        "session {}: no engine response within {:?}",
                        session_id, timeouts.first_result
                    );
                    let e = EngineError::Timeout(timeouts.first_result);
                    emit_error(&session, &results, &e).await;
                    finish(&session, &results).await;
                    forwarder.abort();
                    return;
                }
            }
        } else {
            events.recv().await
        };
        first = false;

        match next {
            Some(EngineEvent::Result {
                alternatives,
                is_final,
            }) => {
                // N-best list, best first; surface only the top hypothesis
                let Some(top) = alternatives.into_iter().next() else {
                    continue;
                };
                let kind = if is_final {
                    EventKind::Final {
                        text: top.transcript,
                        confidence: top.confidence,
                    }
                } else {
                    EventKind::Interim {
                        text: top.transcript,
                        confidence: top.confidence,
                    }
                };
                let event =
                    RecognitionEvent::new(session_id.clone(), session.next_result_seq(), kind);
                if results.push(event).await.is_err() {
                    // Result channel abandoned (session force-terminated)
                    debug!("session {}: result channel gone, stopping", session_id);
                    forwarder.abort();
                    return;
                }
            }
            Some(EngineEvent::Error(e)) => {
                warn!("session {}: engine reported error: {}", session_id, e);
                emit_error(&session, &results, &e).await;
                finish(&session, &results).await;
                forwarder.abort();
                return;
            }
            None => break, // engine has no more output
        }
    }

    let _ = forwarder.await;
    finish(&session, &results).await;
    info!("session {}: recognition stream complete", session_id);
}

/// Exactly one `Error` event; after this only `EndOfStream` may follow.
async fn emit_error(session: &Session, results: &ResultSender, e: &EngineError) {
    let event = RecognitionEvent::new(
        session.id.clone(),
        session.next_result_seq(),
        EventKind::Error {
            code: e.code().to_string(),
            message: e.to_string(),
        },
    );
    if results.push(event).await.is_err() {
        debug!(
            "session {}: result channel closed before error delivery",
            session.id
        );
    }
}

async fn finish(session: &Session, results: &ResultSender) {
    let end = RecognitionEvent::new(
        session.id.clone(),
        session.next_result_seq(),
        EventKind::EndOfStream,
    );
    let _ = results.push(end).await;
    results.close().await;
}
