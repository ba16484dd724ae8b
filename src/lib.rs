pub mod audio;
pub mod config;
pub mod http;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioInput, AudioInputConfig, CpalInput, CpalInputFactory, InputFactory, PreRollBuffer,
    SegmentAccumulator,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{
    CaptureLoop, Session, SessionConfig, SessionManager, SessionStatus, StoppedSession,
    TranscriptEntry,
};
pub use transcribe::{
    EngineFactory, SpeechToText, StubEngine, StubEngineFactory, WhisperEngine,
    WhisperEngineFactory,
};
