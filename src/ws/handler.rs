use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Json};
use base64::Engine;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage};
use super::state::AppState;
use crate::error::OrchestratorError;
use crate::session::SessionOrchestrator;

/// GET /stt/stream
/// Upgrade to the streaming transcription protocol
pub async fn stt_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "active_sessions": state.orchestrator.registry().len().await,
    }))
}

/// One connection, at most one session.
///
/// A single writer task owns the outbound side of the socket so replies
/// and drained results interleave without write races. Disconnecting with
/// a session open is the same as sending `end_session`.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(p) => p,
                Err(e) => {
                    warn!("failed to encode outbound message: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    let mut session_id: Option<String> = None;
    let mut drain_task: Option<JoinHandle<()>> = None;

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            // Binary, ping and pong are not part of the protocol
            _ => continue,
        };

        let parsed: ClientMessage = match serde_json::from_str(&text) {
            Ok(m) => m,
            Err(e) => {
                debug!("unparseable client message: {}", e);
                let _ = out_tx
                    .send(ServerMessage::Error {
                        session_id: session_id.clone(),
                        error_code: "invalid_message".to_string(),
                        error_message: "message is not valid protocol JSON".to_string(),
                    })
                    .await;
                continue;
            }
        };

        match parsed {
            ClientMessage::StartSession { config } => {
                if session_id.is_some() {
                    let _ = out_tx
                        .send(ServerMessage::Error {
                            session_id: session_id.clone(),
                            error_code: "session_already_active".to_string(),
                            error_message: "a session is already open on this connection"
                                .to_string(),
                        })
                        .await;
                    continue;
                }
                match state.orchestrator.start_session(config).await {
                    Ok(id) => {
                        info!("websocket client started session {}", id);
                        session_id = Some(id.clone());
                        let _ = out_tx
                            .send(ServerMessage::SessionStarted {
                                session_id: id.clone(),
                            })
                            .await;
                        drain_task = Some(tokio::spawn(forward_results(
                            Arc::clone(&state.orchestrator),
                            id,
                            out_tx.clone(),
                        )));
                    }
                    Err(e) => {
                        let _ = out_tx.send(error_message(None, &e)).await;
                    }
                }
            }

            ClientMessage::AudioChunk { data, sequence } => {
                let Some(id) = session_id.clone() else {
                    let _ = out_tx
                        .send(ServerMessage::Error {
                            session_id: None,
                            error_code: "session_not_found".to_string(),
                            error_message: "no session started on this connection".to_string(),
                        })
                        .await;
                    continue;
                };
                let bytes = match base64::engine::general_purpose::STANDARD.decode(data.as_bytes())
                {
                    Ok(b) => b,
                    Err(_) => {
                        let _ = out_tx
                            .send(ServerMessage::Error {
                                session_id: Some(id),
                                error_code: "invalid_audio_data".to_string(),
                                error_message: "audio payload is not valid base64".to_string(),
                            })
                            .await;
                        continue;
                    }
                };
                if let Err(e) = state.orchestrator.submit_audio(&id, bytes, sequence).await {
                    let _ = out_tx.send(error_message(Some(id), &e)).await;
                }
            }

            ClientMessage::EndSession => {
                let Some(id) = session_id.take() else {
                    let _ = out_tx
                        .send(ServerMessage::Error {
                            session_id: None,
                            error_code: "session_not_found".to_string(),
                            error_message: "no session started on this connection".to_string(),
                        })
                        .await;
                    continue;
                };
                match state.orchestrator.end_session(&id).await {
                    Ok(()) => {
                        // Let the drain finish delivering buffered results
                        // before announcing the end
                        if let Some(task) = drain_task.take() {
                            let _ = task.await;
                        }
                        let _ = out_tx
                            .send(ServerMessage::SessionEnded { session_id: id })
                            .await;
                    }
                    Err(e) => {
                        let _ = out_tx.send(error_message(Some(id), &e)).await;
                    }
                }
            }
        }
    }

    // Transport disconnect with a session still open: same as end_session
    if let Some(id) = session_id {
        debug!("websocket closed with session {} still open", id);
        if let Err(e) = state.orchestrator.end_session(&id).await {
            debug!("cleanup for session {}: {}", id, e);
        }
    }
    if let Some(task) = drain_task {
        let _ = task.await;
    }

    drop(out_tx);
    let _ = writer.await;
}

/// Forward drained result events to the client until the stream ends.
async fn forward_results(
    orchestrator: Arc<SessionOrchestrator>,
    session_id: String,
    out: mpsc::Sender<ServerMessage>,
) {
    let mut drain = match orchestrator.drain_results(&session_id).await {
        Ok(d) => d,
        Err(e) => {
            debug!("session {}: nothing to drain: {}", session_id, e);
            return;
        }
    };
    while let Some(event) = drain.next().await {
        let Some(msg) = ServerMessage::from_event(event) else {
            break;
        };
        if out.send(msg).await.is_err() {
            break;
        }
    }
}

fn error_message(session_id: Option<String>, e: &OrchestratorError) -> ServerMessage {
    ServerMessage::Error {
        session_id,
        error_code: e.code().to_string(),
        error_message: e.to_string(),
    }
}
