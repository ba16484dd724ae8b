//! Speech-to-text engine abstraction.
//!
//! The engine is an external black box behind a single call: WAV bytes in,
//! text out. It is expensive to construct, so the session manager builds it
//! lazily on first use through an injected `EngineFactory` and shares the
//! one instance across sessions. Only one capture loop is ever active, so
//! calls are sequential by construction.

mod stub;
mod whisper;

pub use stub::{StubEngine, StubEngineFactory};
pub use whisper::{WhisperEngine, WhisperEngineFactory};

use anyhow::Result;
use std::sync::Arc;

/// Transcription contract consumed by the capture loop.
///
/// An empty returned string means the segment contained nothing usable;
/// the caller drops it without error.
pub trait SpeechToText: Send + Sync {
    fn transcribe(&self, wav_bytes: &[u8]) -> Result<String>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Constructs the engine on first use (lazy, at most once).
pub trait EngineFactory: Send + Sync {
    fn load(&self) -> Result<Arc<dyn SpeechToText>>;
}
