// Integration tests for the session orchestrator, driven by a scripted
// recognition engine so every engine behavior (results, errors, refusals,
// hangs) is deterministic.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use stt_gateway::engine::{Alternative, EngineEvent, RecognitionEngine};
use stt_gateway::error::{EngineError, OrchestratorError};
use stt_gateway::session::{
    EventKind, OrchestratorConfig, SessionOrchestrator, SessionState, StreamingConfig,
};

/// Engine that waits for a fixed number of audio chunks, plays back a
/// scripted list of events, then either finishes or holds the stream open.
struct ScriptedEngine {
    events: Vec<EngineEvent>,
    await_chunks: usize,
    hold_open: bool,
    fail_open: Option<EngineError>,
}

impl ScriptedEngine {
    fn completing(await_chunks: usize, events: Vec<EngineEvent>) -> Self {
        Self {
            events,
            await_chunks,
            hold_open: false,
            fail_open: None,
        }
    }

    fn holding_open() -> Self {
        Self {
            events: Vec::new(),
            await_chunks: 0,
            hold_open: true,
            fail_open: None,
        }
    }

    fn refusing(error: EngineError) -> Self {
        Self {
            events: Vec::new(),
            await_chunks: 0,
            hold_open: false,
            fail_open: Some(error),
        }
    }
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn open_stream(
        &self,
        _session_id: &str,
        _config: &StreamingConfig,
        mut audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineError> {
        if let Some(e) = self.fail_open.clone() {
            return Err(e);
        }

        let (tx, rx) = mpsc::channel(16);
        let events = self.events.clone();
        let await_chunks = self.await_chunks;
        let hold_open = self.hold_open;

        tokio::spawn(async move {
            let mut seen = 0usize;
            while seen < await_chunks {
                match audio.recv().await {
                    Some(_) => seen += 1,
                    None => break,
                }
            }
            for event in events {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
            if hold_open {
                // Stay alive until the bridge side goes away
                tx.closed().await;
                return;
            }
            // Swallow any remaining audio, then end the event stream
            while audio.recv().await.is_some() {}
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn orchestrator_with(engine: ScriptedEngine, drain_timeout: Duration) -> SessionOrchestrator {
    SessionOrchestrator::new(
        Arc::new(engine),
        OrchestratorConfig {
            audio_queue_depth: 8,
            result_queue_depth: 16,
            drain_timeout,
            engine_connect_timeout: Duration::from_secs(1),
            engine_first_result_timeout: Duration::from_secs(5),
        },
    )
}

fn valid_config() -> StreamingConfig {
    StreamingConfig {
        language: "en-US".to_string(),
        sample_rate: 16000,
        encoding: "LINEAR16".to_string(),
        model: "latest_long".to_string(),
        punctuation: true,
        interim_results: true,
    }
}

fn interim(text: &str, confidence: f32) -> EngineEvent {
    EngineEvent::Result {
        alternatives: vec![Alternative {
            transcript: text.to_string(),
            confidence,
        }],
        is_final: false,
    }
}

fn final_result(text: &str, confidence: f32) -> EngineEvent {
    EngineEvent::Result {
        alternatives: vec![Alternative {
            transcript: text.to_string(),
            confidence,
        }],
        is_final: true,
    }
}

#[tokio::test]
async fn start_then_end_without_audio_removes_session() -> Result<()> {
    let orch = orchestrator_with(
        ScriptedEngine::completing(0, Vec::new()),
        Duration::from_secs(5),
    );

    let id = orch.start_session(valid_config()).await?;
    assert_eq!(orch.registry().len().await, 1);

    timeout(Duration::from_secs(2), orch.end_session(&id)).await??;

    assert!(orch.registry().get(&id).await.is_none());
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn transcribes_two_fragments_in_order() -> Result<()> {
    let engine =
        ScriptedEngine::completing(2, vec![interim("hel", 0.4), final_result("hello", 0.9)]);
    let orch = orchestrator_with(engine, Duration::from_secs(5));

    let id = orch.start_session(valid_config()).await?;
    let session = orch.registry().get(&id).await.expect("session exists");
    assert_eq!(session.state().await, SessionState::Active);

    orch.submit_audio(&id, vec![0u8; 1600], 0).await?;
    orch.submit_audio(&id, vec![0u8; 1600], 1).await?;
    assert!(session.last_activity().await >= session.created_at);

    let mut drain = orch.drain_results(&id).await?;
    let first = drain.next().await.expect("interim event");
    assert_eq!(
        first.kind,
        EventKind::Interim {
            text: "hel".to_string(),
            confidence: 0.4
        }
    );
    let second = drain.next().await.expect("final event");
    assert_eq!(
        second.kind,
        EventKind::Final {
            text: "hello".to_string(),
            confidence: 0.9
        }
    );
    assert!(first.sequence < second.sequence);
    drop(drain);

    orch.end_session(&id).await?;
    assert!(orch.registry().get(&id).await.is_none());
    Ok(())
}

#[tokio::test]
async fn results_drain_in_sequence_order() -> Result<()> {
    let events = vec![
        interim("a", 0.1),
        interim("ab", 0.2),
        interim("abc", 0.3),
        final_result("abc", 0.8),
    ];
    let orch = orchestrator_with(ScriptedEngine::completing(1, events), Duration::from_secs(5));

    let id = orch.start_session(valid_config()).await?;
    orch.submit_audio(&id, vec![0u8; 320], 0).await?;

    let mut drain = orch.drain_results(&id).await?;
    let mut sequences = Vec::new();
    for _ in 0..4 {
        let event = drain.next().await.expect("scripted event");
        assert!(
            matches!(event.kind, EventKind::Interim { .. } | EventKind::Final { .. }),
            "unexpected event: {:?}",
            event.kind
        );
        sequences.push(event.sequence);
    }
    assert!(
        sequences.windows(2).all(|w| w[0] < w[1]),
        "sequences must be strictly increasing: {:?}",
        sequences
    );

    orch.end_session(&id).await?;
    let end = drain.next().await.expect("end of stream");
    assert!(end.is_end_of_stream());
    assert!(end.sequence > *sequences.last().unwrap());
    assert!(drain.next().await.is_none());
    Ok(())
}

#[tokio::test]
async fn engine_error_is_followed_only_by_end_of_stream() -> Result<()> {
    let events = vec![
        interim("partial", 0.5),
        EngineEvent::Error(EngineError::QuotaExceeded("rate limit".to_string())),
        // The bridge must never read past the error
        final_result("should-never-arrive", 0.99),
    ];
    let orch = orchestrator_with(ScriptedEngine::completing(0, events), Duration::from_secs(5));

    let id = orch.start_session(valid_config()).await?;

    let mut drain = orch.drain_results(&id).await?;
    let mut drained = Vec::new();
    while let Some(event) = drain.next().await {
        drained.push(event);
    }

    assert_eq!(drained.len(), 3, "drained: {:?}", drained);
    assert!(matches!(drained[0].kind, EventKind::Interim { .. }));
    match &drained[1].kind {
        EventKind::Error { code, .. } => assert_eq!(code, "quota_exceeded"),
        other => panic!("expected error event, got {:?}", other),
    }
    assert!(drained[2].is_end_of_stream());
    drop(drain);

    // The bridge exited, so the session must have left Active
    sleep(Duration::from_millis(100)).await;
    let err = orch.submit_audio(&id, vec![1], 0).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotActive(_)));

    orch.end_session(&id).await?;
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn drain_timeout_still_removes_session() -> Result<()> {
    let orch = orchestrator_with(ScriptedEngine::holding_open(), Duration::from_millis(200));

    let id = orch.start_session(valid_config()).await?;
    let started = Instant::now();
    timeout(Duration::from_secs(2), orch.end_session(&id)).await??;

    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn submit_after_end_is_rejected() -> Result<()> {
    let orch = Arc::new(orchestrator_with(
        ScriptedEngine::holding_open(),
        Duration::from_millis(500),
    ));
    let id = orch.start_session(valid_config()).await?;

    let ender = {
        let orch = Arc::clone(&orch);
        let id = id.clone();
        tokio::spawn(async move { orch.end_session(&id).await })
    };
    sleep(Duration::from_millis(100)).await;

    // Teardown in progress: the session exists but no longer takes audio
    let err = orch.submit_audio(&id, vec![1], 0).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotActive(_)));

    ender.await??;

    // After teardown the identifier is gone for good
    let err = orch.submit_audio(&id, vec![2], 1).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotFound(_)));
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn submit_to_unknown_session_has_no_side_effects() -> Result<()> {
    let engine = ScriptedEngine::completing(1, vec![final_result("ok", 0.9)]);
    let orch = orchestrator_with(engine, Duration::from_secs(5));
    let id = orch.start_session(valid_config()).await?;

    let err = orch
        .submit_audio("no-such-session", vec![1], 0)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotFound(_)));

    // The live session is untouched and still accepts audio
    orch.submit_audio(&id, vec![0u8; 100], 0).await?;
    let mut drain = orch.drain_results(&id).await?;
    let event = drain.next().await.expect("result event");
    assert_eq!(
        event.kind,
        EventKind::Final {
            text: "ok".to_string(),
            confidence: 0.9
        }
    );
    drop(drain);

    orch.end_session(&id).await?;
    Ok(())
}

#[tokio::test]
async fn end_unknown_session_returns_not_found() {
    let orch = orchestrator_with(
        ScriptedEngine::completing(0, Vec::new()),
        Duration::from_secs(1),
    );
    let err = orch.end_session("missing").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionNotFound(_)));
    assert_eq!(err.code(), "session_not_found");
}

#[tokio::test]
async fn invalid_configs_are_rejected_without_a_session() -> Result<()> {
    let orch = orchestrator_with(
        ScriptedEngine::completing(0, Vec::new()),
        Duration::from_secs(1),
    );

    let mut missing_language = valid_config();
    missing_language.language = String::new();
    let mut zero_rate = valid_config();
    zero_rate.sample_rate = 0;
    let mut odd_rate = valid_config();
    odd_rate.sample_rate = 11025;
    let mut blank_encoding = valid_config();
    blank_encoding.encoding = "  ".to_string();

    for config in [missing_language, zero_rate, odd_rate, blank_encoding] {
        let err = orch.start_session(config).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidConfig(_)));
        assert_eq!(err.code(), "invalid_config");
    }
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn engine_refusal_surfaces_as_error_event() -> Result<()> {
    let orch = orchestrator_with(
        ScriptedEngine::refusing(EngineError::ConnectionReset("engine offline".to_string())),
        Duration::from_secs(1),
    );

    let id = orch.start_session(valid_config()).await?;

    let mut drain = orch.drain_results(&id).await?;
    let first = drain.next().await.expect("error event");
    match &first.kind {
        EventKind::Error { code, .. } => assert_eq!(code, "connection_reset"),
        other => panic!("expected error event, got {:?}", other),
    }
    let end = drain.next().await.expect("end of stream");
    assert!(end.is_end_of_stream());
    drop(drain);

    orch.end_session(&id).await?;
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_end_session_calls_are_idempotent() -> Result<()> {
    let orch = Arc::new(orchestrator_with(
        ScriptedEngine::holding_open(),
        Duration::from_millis(300),
    ));
    let id = orch.start_session(valid_config()).await?;

    let spawn_end = |orch: Arc<SessionOrchestrator>, id: String| {
        tokio::spawn(async move { orch.end_session(&id).await })
    };
    let a = spawn_end(Arc::clone(&orch), id.clone());
    let b = spawn_end(Arc::clone(&orch), id.clone());

    for res in [a.await?, b.await?] {
        match res {
            Ok(()) => {}
            // A caller arriving after removal sees the id gone; that is
            // still a clean outcome
            Err(OrchestratorError::SessionNotFound(_)) => {}
            Err(e) => panic!("unexpected end_session failure: {}", e),
        }
    }
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}

#[tokio::test]
async fn sessions_get_unique_identifiers() -> Result<()> {
    let orch = orchestrator_with(
        ScriptedEngine::completing(0, Vec::new()),
        Duration::from_secs(5),
    );

    let a = orch.start_session(valid_config()).await?;
    let b = orch.start_session(valid_config()).await?;
    assert_ne!(a, b);
    assert_eq!(orch.registry().len().await, 2);

    orch.end_session(&a).await?;
    orch.end_session(&b).await?;
    assert_eq!(orch.registry().len().await, 0);
    Ok(())
}
