use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a recording session.
///
/// Snapshotted immutably at session creation; every field is optional in the
/// start request and falls back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// RMS energy threshold above which a frame counts as speech, in [0, 1]
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,

    /// Seconds of audio retained before speech onset and prepended to a segment
    #[serde(default = "default_pre_roll_seconds")]
    pub pre_roll_seconds: f32,

    /// Seconds of trailing silence that close a segment
    #[serde(default = "default_silence_timeout_seconds")]
    pub silence_timeout_seconds: f32,

    /// Maximum segment duration before a forced split
    #[serde(default = "default_max_segment_seconds")]
    pub max_segment_seconds: f32,
}

fn default_vad_threshold() -> f32 {
    0.013
}

fn default_pre_roll_seconds() -> f32 {
    0.5
}

fn default_silence_timeout_seconds() -> f32 {
    0.3
}

fn default_max_segment_seconds() -> f32 {
    5.0
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            vad_threshold: default_vad_threshold(),
            pre_roll_seconds: default_pre_roll_seconds(),
            silence_timeout_seconds: default_silence_timeout_seconds(),
            max_segment_seconds: default_max_segment_seconds(),
        }
    }
}

impl SessionConfig {
    /// Reject out-of-range values before any device or engine is touched.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            bail!(
                "vad_threshold must be within [0, 1], got {}",
                self.vad_threshold
            );
        }
        if !(self.pre_roll_seconds > 0.0) {
            bail!(
                "pre_roll_seconds must be positive, got {}",
                self.pre_roll_seconds
            );
        }
        if !(self.silence_timeout_seconds > 0.0) {
            bail!(
                "silence_timeout_seconds must be positive, got {}",
                self.silence_timeout_seconds
            );
        }
        if !(self.max_segment_seconds > 0.0) {
            bail!(
                "max_segment_seconds must be positive, got {}",
                self.max_segment_seconds
            );
        }
        Ok(())
    }
}
