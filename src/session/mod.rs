pub mod capture;
pub mod config;
pub mod manager;
pub mod session;
pub mod transcript;

pub use capture::CaptureLoop;
pub use config::SessionConfig;
pub use manager::SessionManager;
pub use session::Session;
pub use transcript::{SessionStatus, StoppedSession, TranscriptEntry};
