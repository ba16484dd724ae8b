//! Energy-based voice activity detection.
//!
//! Classifies a frame of 16-bit samples as speech or non-speech by RMS
//! thresholding. Stateless: every frame is classified independently, no
//! history or hysteresis. The threshold comes from the session config and
//! is validated to [0, 1] at session creation.

/// Returns true if the frame's RMS energy exceeds `threshold`.
///
/// Samples are normalized to [-1, 1] before the RMS is computed, so the
/// threshold is independent of bit depth. An empty frame is never speech.
pub fn is_speech(frame: &[i16], threshold: f32) -> bool {
    if frame.is_empty() {
        return false;
    }

    let sum_sq: f64 = frame
        .iter()
        .map(|&s| {
            let normalized = s as f64 / 32768.0;
            normalized * normalized
        })
        .sum();
    let rms = (sum_sq / frame.len() as f64).sqrt();

    rms > threshold as f64
}
