//! Whisper engine over whisper-rs.
//!
//! The GGML model is loaded once and reused for every segment; loading takes
//! seconds, a transcription call takes well under the segment cadence for
//! the small models this targets.

use super::{EngineFactory, SpeechToText};
use crate::audio::wav;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

pub struct WhisperEngine {
    ctx: WhisperContext,
    language: String,
}

impl WhisperEngine {
    pub fn load(model_path: &str, language: &str) -> Result<Self> {
        info!("Loading whisper model from {}", model_path);
        let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
            .context("Failed to load whisper model")?;
        info!("Whisper model loaded successfully");
        Ok(Self {
            ctx,
            language: language.to_string(),
        })
    }
}

impl SpeechToText for WhisperEngine {
    fn transcribe(&self, wav_bytes: &[u8]) -> Result<String> {
        let samples = wav::decode_to_f32(wav_bytes)?;
        if samples.is_empty() {
            return Ok(String::new());
        }

        let mut state = self
            .ctx
            .create_state()
            .context("Failed to create whisper state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(&self.language));
        params.set_n_threads(num_cpus::get().min(8) as i32);
        params.set_print_progress(false);
        params.set_print_timestamps(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_translate(false);

        state
            .full(params, &samples)
            .context("Whisper inference failed")?;

        let num_segments = state
            .full_n_segments()
            .context("Failed to read segment count")?;

        let mut text = String::new();
        for i in 0..num_segments {
            let segment = state
                .full_get_segment_text_lossy(i)
                .with_context(|| format!("Failed to read whisper segment {}", i))?;
            text.push_str(&segment);
        }

        // whisper.cpp emits a marker token for silence-only input
        let text = text.replace("[BLANK_AUDIO]", "");
        debug!("Whisper produced {} chars", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

/// Builds a `WhisperEngine` on first session start.
pub struct WhisperEngineFactory {
    model_path: String,
    language: String,
}

impl WhisperEngineFactory {
    pub fn new(model_path: String, language: String) -> Self {
        Self {
            model_path,
            language,
        }
    }
}

impl EngineFactory for WhisperEngineFactory {
    fn load(&self) -> Result<Arc<dyn SpeechToText>> {
        Ok(Arc::new(WhisperEngine::load(
            &self.model_path,
            &self.language,
        )?))
    }
}
