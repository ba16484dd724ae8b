use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single transcription result appended by the capture loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Transcribed text (trimmed, never empty)
    pub text: String,

    /// When the transcription completed
    pub timestamp: DateTime<Utc>,

    /// Whether this is a final (non-interim) result
    pub is_final: bool,
}

/// Non-blocking view of the registry for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// "active" or "idle"
    pub status: String,

    /// Id of the active session, if any
    pub session_id: Option<String>,

    /// When the active session started, if any
    pub started_at: Option<DateTime<Utc>>,

    /// Whether recording is currently active
    pub is_recording: bool,

    /// Number of transcript entries accumulated so far
    pub transcription_count: usize,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            status: "idle".to_string(),
            session_id: None,
            started_at: None,
            is_recording: false,
            transcription_count: 0,
        }
    }
}

/// Final result of a stopped session: the retired id and a copy of its
/// transcript, including any trailing partial segment flushed on stop.
#[derive(Debug, Clone)]
pub struct StoppedSession {
    pub session_id: String,
    pub transcript: Vec<TranscriptEntry>,
}
