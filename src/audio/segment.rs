//! Speech/silence state machine that turns a stream of classified frames
//! into a sequence of bounded audio segments.
//!
//! Two states: `Idle` (no segment in progress) and `Active` (accumulating).
//! A segment opens on the first voiced frame, seeded with the pre-roll
//! snapshot so the onset is not clipped. It closes either when trailing
//! silence reaches the timeout, or when it reaches the maximum duration.
//!
//! The two closure paths differ on purpose: a silence closure ends the
//! speech episode (pre-roll is cleared, state returns to `Idle`), while a
//! max-duration closure during continuous speech splits the same episode
//! (pre-roll is kept, state remains `Active`, and the continuation segment
//! gets no pre-roll lead-in).

use super::preroll::PreRollBuffer;

pub struct SegmentAccumulator {
    preroll: PreRollBuffer,
    silence_timeout_secs: f32,
    max_segment_secs: f32,
    bytes_per_second: usize,

    active: bool,
    buffer: Vec<u8>,
    elapsed_secs: f32,
    silence_secs: f32,
}

impl SegmentAccumulator {
    pub fn new(
        pre_roll_seconds: f32,
        silence_timeout_secs: f32,
        max_segment_secs: f32,
        bytes_per_second: usize,
    ) -> Self {
        Self {
            preroll: PreRollBuffer::new(pre_roll_seconds, bytes_per_second),
            silence_timeout_secs,
            max_segment_secs,
            bytes_per_second,
            active: false,
            buffer: Vec::new(),
            elapsed_secs: 0.0,
            silence_secs: 0.0,
        }
    }

    /// Feed one classified frame of raw PCM bytes.
    ///
    /// Returns a completed segment when this frame closed one. The pre-roll
    /// receives every frame regardless of state.
    pub fn push_frame(&mut self, frame: &[u8], has_voice: bool) -> Option<Vec<u8>> {
        let frame_secs = frame.len() as f32 / self.bytes_per_second as f32;

        let emitted = if !self.active {
            if has_voice {
                // Speech onset: seed the segment with the pre-roll backfill
                self.buffer = self.preroll.snapshot();
                self.buffer.extend_from_slice(frame);
                self.elapsed_secs = self.buffer.len() as f32 / self.bytes_per_second as f32;
                self.silence_secs = 0.0;
                self.active = true;
            }
            None
        } else {
            self.buffer.extend_from_slice(frame);
            self.elapsed_secs += frame_secs;

            if has_voice {
                self.silence_secs = 0.0;
                if self.elapsed_secs >= self.max_segment_secs {
                    // Max-duration split mid-speech: the episode continues,
                    // so stay Active and keep the pre-roll untouched
                    self.elapsed_secs = 0.0;
                    Some(std::mem::take(&mut self.buffer))
                } else {
                    None
                }
            } else {
                self.silence_secs += frame_secs;
                if self.silence_secs >= self.silence_timeout_secs
                    || self.elapsed_secs >= self.max_segment_secs
                {
                    self.active = false;
                    self.elapsed_secs = 0.0;
                    self.silence_secs = 0.0;
                    self.preroll.clear();
                    Some(std::mem::take(&mut self.buffer))
                } else {
                    None
                }
            }
        };

        self.preroll.add(frame);
        emitted
    }

    /// Flush the in-progress segment on stop, so no audio is silently
    /// discarded. Returns `None` when idle or empty.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.active && !self.buffer.is_empty() {
            self.active = false;
            self.elapsed_secs = 0.0;
            self.silence_secs = 0.0;
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 16 kHz mono 16-bit
    const BPS: usize = 32000;
    // 100 ms frame
    const FRAME_BYTES: usize = 3200;

    fn frame(fill: u8) -> Vec<u8> {
        vec![fill; FRAME_BYTES]
    }

    fn accumulator() -> SegmentAccumulator {
        SegmentAccumulator::new(0.5, 0.3, 5.0, BPS)
    }

    #[test]
    fn silence_alone_emits_nothing() {
        let mut acc = accumulator();
        for _ in 0..50 {
            assert!(acc.push_frame(&frame(0), false).is_none());
        }
        assert!(!acc.is_active());
    }

    #[test]
    fn silence_terminated_segment_includes_preroll_and_trailing_silence() {
        let mut acc = accumulator();

        // 0.5s of pre-roll silence
        for _ in 0..5 {
            assert!(acc.push_frame(&frame(0), false).is_none());
        }
        // 1.0s of speech
        let mut emitted = None;
        for _ in 0..10 {
            emitted = acc.push_frame(&frame(1), true);
            assert!(emitted.is_none());
        }
        assert!(acc.is_active());
        // 0.5s of trailing silence; timeout 0.3s closes on the 3rd frame
        for i in 0..5 {
            emitted = acc.push_frame(&frame(0), false);
            if i < 2 {
                assert!(emitted.is_none());
            } else {
                break;
            }
        }

        let segment = emitted.expect("segment should close on silence timeout");
        // 0.5 pre-roll + 1.0 speech + 0.3 silence = 1.8s
        assert_eq!(segment.len(), FRAME_BYTES * 18);
        assert!(!acc.is_active());
    }

    #[test]
    fn max_duration_split_stays_active_without_preroll_reseed() {
        let mut acc = accumulator();
        let mut segments = Vec::new();

        // 6s of continuous speech, no prior pre-roll content
        for _ in 0..60 {
            if let Some(seg) = acc.push_frame(&frame(1), true) {
                segments.push(seg);
            }
        }
        if let Some(seg) = acc.finish() {
            segments.push(seg);
        }

        assert_eq!(segments.len(), 2);
        // First closes at the 5.0s cap
        assert_eq!(segments[0].len(), FRAME_BYTES * 50);
        // Continuation carries no pre-roll lead-in
        assert_eq!(segments[1].len(), FRAME_BYTES * 10);
    }

    #[test]
    fn preroll_reseeds_after_silence_closure() {
        let mut acc = accumulator();

        // First episode: speech then silence closure
        for _ in 0..5 {
            acc.push_frame(&frame(1), true);
        }
        let mut closed = None;
        for _ in 0..3 {
            closed = acc.push_frame(&frame(0), false);
        }
        assert!(closed.is_some());

        // Pre-roll was cleared at closure, then collected the 100 ms silent
        // frame that closed the segment plus nothing else yet. Next onset
        // seeds from that small pre-roll only.
        let seg = acc.push_frame(&frame(2), true);
        assert!(seg.is_none());
        assert!(acc.is_active());
        let flushed = acc.finish().expect("active buffer flushes");
        // closing silent frame (still in pre-roll) + onset frame
        assert_eq!(flushed.len(), FRAME_BYTES * 2);
    }

    #[test]
    fn segment_length_bounded_by_max_plus_preroll() {
        let mut acc = accumulator();
        let max_bytes = FRAME_BYTES * 50; // 5.0s
        let preroll_bytes = BPS / 2; // 0.5s

        // Fill pre-roll, then alternate speech bursts and silence
        for _ in 0..20 {
            acc.push_frame(&frame(0), false);
        }
        for round in 0..4 {
            for _ in 0..70 {
                if let Some(seg) = acc.push_frame(&frame(round), true) {
                    assert!(seg.len() <= max_bytes + preroll_bytes, "round {round}");
                }
            }
            for _ in 0..4 {
                if let Some(seg) = acc.push_frame(&frame(0), false) {
                    assert!(seg.len() <= max_bytes + preroll_bytes, "round {round}");
                }
            }
        }
    }

    #[test]
    fn finish_flushes_active_buffer() {
        let mut acc = accumulator();
        acc.push_frame(&frame(1), true);
        acc.push_frame(&frame(1), true);
        let flushed = acc.finish().expect("in-progress segment flushes on stop");
        assert_eq!(flushed.len(), FRAME_BYTES * 2);
        assert!(!acc.is_active());
        assert!(acc.finish().is_none());
    }

    #[test]
    fn finish_when_idle_is_none() {
        let mut acc = accumulator();
        acc.push_frame(&frame(0), false);
        assert!(acc.finish().is_none());
    }
}
