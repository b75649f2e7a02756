use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{StreamAudioMessage, StreamBeginMessage, StreamResultMessage};
use super::{Alternative, EngineEvent, RecognitionEngine};
use crate::error::EngineError;
use crate::session::StreamingConfig;

/// Recognition engine reached over NATS: audio frames out on the session's
/// audio subject, results in on its result subject.
pub struct NatsEngine {
    client: Client,
}

impl NatsEngine {
    /// Connect to the NATS server backing the STT service
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to recognition engine at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to recognition engine");

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for NatsEngine {
    async fn open_stream(
        &self,
        session_id: &str,
        config: &StreamingConfig,
        mut audio: mpsc::Receiver<Vec<u8>>,
    ) -> Result<mpsc::Receiver<EngineEvent>, EngineError> {
        // Subscribe before announcing the stream so no result can slip past
        let result_subject = format!("stt.stream.result.{}", session_id);
        let mut subscriber = self
            .client
            .subscribe(result_subject)
            .await
            .map_err(|e| EngineError::ConnectionReset(e.to_string()))?;

        let begin = StreamBeginMessage {
            session_id: session_id.to_string(),
            language: config.language.clone(),
            sample_rate: config.sample_rate,
            encoding: config.encoding.clone(),
            model: config.model.clone(),
            punctuation: config.punctuation,
            interim_results: config.interim_results,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload =
            serde_json::to_vec(&begin).map_err(|e| EngineError::Failed(e.to_string()))?;
        self.client
            .publish(format!("stt.stream.begin.{}", session_id), payload.into())
            .await
            .map_err(|e| EngineError::ConnectionReset(e.to_string()))?;

        // Forward audio chunks to the engine as they arrive
        let client = self.client.clone();
        let audio_subject = format!("stt.stream.audio.{}", session_id);
        let sid = session_id.to_string();
        tokio::spawn(async move {
            let mut sequence: u64 = 0;
            while let Some(chunk) = audio.recv().await {
                let frame = StreamAudioMessage {
                    session_id: sid.clone(),
                    sequence,
                    audio: base64::engine::general_purpose::STANDARD.encode(&chunk),
                    final_frame: false,
                };
                sequence += 1;
                let payload = match serde_json::to_vec(&frame) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("session {}: failed to encode audio frame: {}", sid, e);
                        continue;
                    }
                };
                if let Err(e) = client.publish(audio_subject.clone(), payload.into()).await {
                    warn!("session {}: failed to publish audio frame: {}", sid, e);
                    break;
                }
            }

            // Empty terminal frame tells the engine there is no more audio
            let last = StreamAudioMessage {
                session_id: sid.clone(),
                sequence,
                audio: String::new(),
                final_frame: true,
            };
            match serde_json::to_vec(&last) {
                Ok(payload) => {
                    if let Err(e) = client.publish(audio_subject, payload.into()).await {
                        warn!("session {}: failed to publish final frame: {}", sid, e);
                    }
                }
                Err(e) => warn!("session {}: failed to encode final frame: {}", sid, e),
            }
            debug!("session {}: audio feed to engine finished", sid);
        });

        // Translate engine result messages into events
        let (tx, rx) = mpsc::channel(32);
        let sid = session_id.to_string();
        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let parsed: StreamResultMessage = match serde_json::from_slice(&msg.payload) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("session {}: unparseable engine message: {}", sid, e);
                        continue;
                    }
                };
                if parsed.session_id != sid {
                    continue;
                }

                if let Some(err) = parsed.error {
                    let _ = tx
                        .send(EngineEvent::Error(EngineError::from_wire(
                            &err.code,
                            err.message,
                        )))
                        .await;
                    break;
                }

                if !parsed.alternatives.is_empty() {
                    let alternatives = parsed
                        .alternatives
                        .into_iter()
                        .map(|a| Alternative {
                            transcript: a.transcript,
                            confidence: a.confidence,
                        })
                        .collect();
                    if tx
                        .send(EngineEvent::Result {
                            alternatives,
                            is_final: parsed.is_final,
                        })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }

                if parsed.end_of_stream {
                    debug!("session {}: engine signalled end of output", sid);
                    break;
                }
            }
            // tx drops here: the engine has no more output
        });

        Ok(rx)
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}
