use super::config::SessionConfig;
use super::transcript::TranscriptEntry;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// One recording-and-transcription episode, from start to stop.
///
/// Mutated from two sides only: the capture loop appends transcript entries,
/// and whoever issues stop flips the flags. The transcript is append-only;
/// readers take a copy under a short critical section so the capture loop is
/// never blocked on a slow consumer.
pub struct Session {
    id: String,
    config: SessionConfig,
    started_at: DateTime<Utc>,

    /// True from creation until stop completes
    recording: AtomicBool,

    /// One-shot cancellation signal; idempotent to fire twice. The capture
    /// loop observes it at the top of its next iteration.
    cancelled: AtomicBool,

    transcript: Mutex<Vec<TranscriptEntry>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            id: next_session_id(),
            config,
            started_at: Utc::now(),
            recording: AtomicBool::new(true),
            cancelled: AtomicBool::new(false),
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn set_recording(&self, recording: bool) {
        self.recording.store(recording, Ordering::SeqCst);
    }

    /// Fire the stop signal. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Append a completed transcription. Called only from the capture loop.
    pub fn append_transcript(&self, entry: TranscriptEntry) {
        let mut transcript = self.transcript.lock().unwrap();
        transcript.push(entry);
    }

    /// Copy out the full transcript.
    pub fn transcript_snapshot(&self) -> Vec<TranscriptEntry> {
        self.transcript.lock().unwrap().clone()
    }

    /// Copy out entries from `offset` onward. The transcript only grows, so
    /// a consumer polling with its own offset sees a monotonic prefix.
    pub fn transcript_from(&self, offset: usize) -> Vec<TranscriptEntry> {
        let transcript = self.transcript.lock().unwrap();
        transcript.get(offset..).unwrap_or_default().to_vec()
    }

    pub fn transcript_len(&self) -> usize {
        self.transcript.lock().unwrap().len()
    }
}

/// Timestamp plus a monotonic counter, unique within the process lifetime.
fn next_session_id() -> String {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "{}_{}",
        Utc::now().format("%Y%m%d_%H%M%S_%3f"),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Session::new(SessionConfig::default());
        let b = Session::new(SessionConfig::default());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn cancel_is_idempotent() {
        let session = Session::new(SessionConfig::default());
        assert!(!session.is_cancelled());
        session.cancel();
        session.cancel();
        assert!(session.is_cancelled());
    }

    #[test]
    fn transcript_appends_in_order() {
        let session = Session::new(SessionConfig::default());
        for i in 0..5 {
            session.append_transcript(TranscriptEntry {
                text: format!("entry {i}"),
                timestamp: Utc::now(),
                is_final: true,
            });
        }
        let all = session.transcript_snapshot();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].text, "entry 0");
        assert_eq!(all[4].text, "entry 4");

        let tail = session.transcript_from(3);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "entry 3");

        assert!(session.transcript_from(99).is_empty());
    }
}
