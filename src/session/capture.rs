use super::session::Session;
use super::transcript::TranscriptEntry;
use crate::audio::{vad, wav, AudioInput, AudioInputConfig, SegmentAccumulator};
use crate::transcribe::SpeechToText;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Backoff after a failed microphone read before retrying.
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// The producer side of a session: owns the microphone for the session's
/// lifetime, reads 100 ms frames, feeds the VAD and segment accumulator, and
/// transcribes each emitted segment into the session transcript.
///
/// Runs on a dedicated blocking thread. The loop checks the session's cancel
/// signal at the top of each iteration, so stop latency is bounded by one
/// frame read. On exit it flushes any in-progress segment before the input
/// is dropped and the device released.
pub struct CaptureLoop {
    input: Box<dyn AudioInput>,
    engine: Arc<dyn SpeechToText>,
    session: Arc<Session>,
    audio: AudioInputConfig,
    accumulator: SegmentAccumulator,
}

impl CaptureLoop {
    pub fn new(
        input: Box<dyn AudioInput>,
        engine: Arc<dyn SpeechToText>,
        session: Arc<Session>,
        audio: AudioInputConfig,
    ) -> Self {
        let config = session.config();
        let accumulator = SegmentAccumulator::new(
            config.pre_roll_seconds,
            config.silence_timeout_seconds,
            config.max_segment_seconds,
            audio.bytes_per_second(),
        );
        Self {
            input,
            engine,
            session,
            audio,
            accumulator,
        }
    }

    /// Run until the session's cancel signal fires, then flush and tear down.
    pub fn run(mut self) {
        info!(
            "Capture loop started for session {} ({} input)",
            self.session.id(),
            self.input.name()
        );

        let frame_duration = self.audio.frame_duration();
        let threshold = self.session.config().vad_threshold;

        while !self.session.is_cancelled() {
            match self.input.read_frame(frame_duration) {
                Ok(samples) => {
                    let has_voice = vad::is_speech(&samples, threshold);
                    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
                    if let Some(segment) = self.accumulator.push_frame(&pcm, has_voice) {
                        self.transcribe_segment(segment);
                    }
                }
                Err(e) => {
                    // Transient driver glitches must not kill the session
                    warn!(
                        "Microphone read failed for session {}: {}; retrying",
                        self.session.id(),
                        e
                    );
                    std::thread::sleep(READ_RETRY_BACKOFF);
                }
            }
        }

        // No audio is silently discarded on stop
        if let Some(segment) = self.accumulator.finish() {
            debug!(
                "Flushing in-progress segment ({} bytes) for session {}",
                segment.len(),
                self.session.id()
            );
            self.transcribe_segment(segment);
        }

        info!("Capture loop stopped for session {}", self.session.id());
        // self.input dropped here, releasing the device
    }

    /// Transcribe one completed segment and append the result.
    ///
    /// A failed or empty transcription drops the segment and nothing else;
    /// subsequent segments are unaffected.
    fn transcribe_segment(&self, pcm: Vec<u8>) {
        let wav_bytes = match wav::encode(&pcm, self.audio.sample_rate, self.audio.channels) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    "Failed to encode segment for session {}: {}",
                    self.session.id(),
                    e
                );
                return;
            }
        };

        match self.engine.transcribe(&wav_bytes) {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!(
                        "Empty transcription for session {}, dropping segment",
                        self.session.id()
                    );
                    return;
                }
                info!(
                    "Transcription for session {}: {:.50}",
                    self.session.id(),
                    text
                );
                self.session.append_transcript(TranscriptEntry {
                    text: text.to_string(),
                    timestamp: Utc::now(),
                    is_final: true,
                });
            }
            Err(e) => {
                error!(
                    "Transcription failed for session {}, dropping segment: {}",
                    self.session.id(),
                    e
                );
            }
        }
    }
}
