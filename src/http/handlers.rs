use super::state::AppState;
use crate::session::{SessionConfig, TranscriptEntry};
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: String,
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub status: String,
    pub session_id: String,
    pub transcriptions: Vec<TranscriptEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /audio/start
/// Start a recording session, stopping any existing one first.
/// The body is optional; missing fields fall back to defaults.
pub async fn start_recording(
    State(state): State<AppState>,
    body: Option<Json<SessionConfig>>,
) -> impl IntoResponse {
    let config = body.map(|Json(config)| config).unwrap_or_default();

    if let Err(e) = config.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid session config: {}", e),
            }),
        )
            .into_response();
    }

    match state.manager.start_session(config).await {
        Ok(session) => {
            let session_id = session.id().to_string();
            (
                StatusCode::OK,
                Json(StartResponse {
                    status: "recording".to_string(),
                    session_id: session_id.clone(),
                    message: format!("Recording started. Session ID: {}", session_id),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to start recording: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to start recording: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /audio/stop
/// Stop the active session and return its transcript.
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    match state.manager.stop_session().await {
        Some(stopped) => {
            info!("Stopped recording session: {}", stopped.session_id);
            (
                StatusCode::OK,
                Json(StopResponse {
                    status: "stopped".to_string(),
                    session_id: stopped.session_id,
                    transcriptions: stopped.transcript,
                }),
            )
                .into_response()
        }
        None => {
            warn!("No active recording session found");
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "No active recording session".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /audio/status
/// Non-blocking view of the current session registry.
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.manager.status()))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// WebSocket streaming
// ============================================================================

/// GET /audio/stream
/// Push channel for live transcriptions. Attaches to the active session or
/// auto-starts one; a "stop" text message (or disconnect) stops the session
/// and drains undelivered entries before closing.
pub async fn stream_transcriptions(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_stream(socket, state))
}

async fn handle_stream(mut socket: WebSocket, state: AppState) {
    info!("WebSocket connection established");

    let session = match state.manager.active_session() {
        Some(session) => session,
        None => match state.manager.start_session(SessionConfig::default()).await {
            Ok(session) => {
                let started = json!({
                    "type": "status",
                    "status": "started",
                    "session_id": session.id(),
                });
                if socket.send(Message::Text(started.to_string())).await.is_err() {
                    let _ = state.manager.stop_session_if(session.id()).await;
                    return;
                }
                session
            }
            Err(e) => {
                error!("Failed to auto-start session for WebSocket: {}", e);
                let payload = json!({"type": "error", "error": e.to_string()});
                socket.send(Message::Text(payload.to_string())).await.ok();
                return;
            }
        },
    };

    let mut sent = 0usize;
    let mut poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match forward_new_entries(&mut socket, &session.transcript_from(sent)).await {
                    Ok(count) => sent += count,
                    Err(_) => break,
                }
                if !session.is_recording() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) if text.trim() == "stop" => {
                        info!("WebSocket client requested stop");
                        break;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket disconnected");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Same stop/flush/retire sequence as POST /audio/stop, but scoped to the
    // session this socket attached to: an HTTP caller may have stopped it
    // (and started a successor) between polls, and that successor must not
    // be torn down here. The flush may append a trailing segment, so drain
    // after the session has stopped.
    let _ = state.manager.stop_session_if(session.id()).await;
    if forward_new_entries(&mut socket, &session.transcript_from(sent))
        .await
        .is_err()
    {
        warn!("WebSocket closed before final transcriptions were delivered");
    }

    socket.send(Message::Close(None)).await.ok();
    info!("WebSocket connection closed");
}

/// Send each entry as a JSON message; returns how many were delivered.
async fn forward_new_entries(
    socket: &mut WebSocket,
    entries: &[TranscriptEntry],
) -> Result<usize, axum::Error> {
    for (i, entry) in entries.iter().enumerate() {
        let payload = json!({"type": "transcription", "data": entry});
        if let Err(e) = socket.send(Message::Text(payload.to_string())).await {
            if i > 0 {
                warn!("WebSocket send failed after {} entries: {}", i, e);
            }
            return Err(e);
        }
    }
    Ok(entries.len())
}
