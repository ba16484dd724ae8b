use super::capture::CaptureLoop;
use super::config::SessionConfig;
use super::session::Session;
use super::transcript::{SessionStatus, StoppedSession};
use crate::audio::{AudioInputConfig, InputFactory};
use crate::transcribe::{EngineFactory, SpeechToText};
use anyhow::{Context, Result};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long stop/start wait for a capture loop to join before abandoning it.
const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct ActiveSession {
    session: Arc<Session>,
    handle: Option<JoinHandle<()>>,
}

/// Process-wide registry enforcing at most one active recording session.
///
/// Start and stop are serialized through a single lifecycle lock, so two
/// near-simultaneous starts converge on exactly one active session. Status
/// reads go through a separate snapshot lock and never wait on a transition
/// in progress. The transcription engine is built lazily on first start and
/// shared read-only across sessions.
pub struct SessionManager {
    engine_factory: Arc<dyn EngineFactory>,
    input_factory: Arc<dyn InputFactory>,
    audio: AudioInputConfig,
    engine: OnceCell<Arc<dyn SpeechToText>>,
    current: RwLock<Option<ActiveSession>>,
    lifecycle: tokio::sync::Mutex<()>,
    join_timeout: Duration,
}

impl SessionManager {
    pub fn new(
        engine_factory: Arc<dyn EngineFactory>,
        input_factory: Arc<dyn InputFactory>,
        audio: AudioInputConfig,
    ) -> Self {
        Self {
            engine_factory,
            input_factory,
            audio,
            engine: OnceCell::new(),
            current: RwLock::new(None),
            lifecycle: tokio::sync::Mutex::new(()),
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Start a new session, retiring any existing one first.
    ///
    /// Validation happens before the teardown of the previous session, so a
    /// bad config leaves the current session untouched. Device or engine
    /// failure aborts before anything is registered.
    pub async fn start_session(&self, config: SessionConfig) -> Result<Arc<Session>> {
        config.validate()?;

        let _guard = self.lifecycle.lock().await;
        self.retire_active().await;

        let engine = self.engine().await?;

        let input_factory = Arc::clone(&self.input_factory);
        let input = tokio::task::spawn_blocking(move || input_factory.open())
            .await
            .context("Input open task failed")?
            .context("Failed to open audio input")?;

        let session = Arc::new(Session::new(config));
        info!("Started recording session: {}", session.id());

        let capture = CaptureLoop::new(input, engine, Arc::clone(&session), self.audio.clone());
        let handle = tokio::task::spawn_blocking(move || capture.run());

        *self.current.write().unwrap() = Some(ActiveSession {
            session: Arc::clone(&session),
            handle: Some(handle),
        });

        Ok(session)
    }

    /// Stop the active session and return its transcript, or `None` when no
    /// session is active.
    pub async fn stop_session(&self) -> Option<StoppedSession> {
        let _guard = self.lifecycle.lock().await;

        let active = self.current.write().unwrap().take()?;
        info!("Stopping recording session: {}", active.session.id());
        Some(self.finish_stop(active).await)
    }

    /// Stop the active session only if it is the one identified by
    /// `session_id`. Returns `None` when a different session (or none) is
    /// registered, leaving it untouched. Consumers that attached to a
    /// session earlier use this so they never tear down a successor started
    /// by someone else.
    pub async fn stop_session_if(&self, session_id: &str) -> Option<StoppedSession> {
        let _guard = self.lifecycle.lock().await;

        let active = {
            let mut current = self.current.write().unwrap();
            let is_attached = current
                .as_ref()
                .is_some_and(|active| active.session.id() == session_id);
            if is_attached {
                current.take()
            } else {
                None
            }
        }?;
        info!("Stopping recording session: {}", active.session.id());
        Some(self.finish_stop(active).await)
    }

    /// Non-blocking read of the current registry state.
    pub fn status(&self) -> SessionStatus {
        let current = self.current.read().unwrap();
        match current.as_ref() {
            Some(active) => SessionStatus {
                status: "active".to_string(),
                session_id: Some(active.session.id().to_string()),
                started_at: Some(active.session.started_at()),
                is_recording: active.session.is_recording(),
                transcription_count: active.session.transcript_len(),
            },
            None => SessionStatus::idle(),
        }
    }

    pub fn active_session(&self) -> Option<Arc<Session>> {
        let current = self.current.read().unwrap();
        current.as_ref().map(|active| Arc::clone(&active.session))
    }

    /// Lazily build the shared engine handle. Construction is expensive, so
    /// it runs on a blocking thread; at most one build ever succeeds.
    async fn engine(&self) -> Result<Arc<dyn SpeechToText>> {
        self.engine
            .get_or_try_init(|| async {
                let factory = Arc::clone(&self.engine_factory);
                tokio::task::spawn_blocking(move || factory.load())
                    .await
                    .context("Engine load task failed")?
            })
            .await
            .cloned()
    }

    /// Cancel and join the current session, removing it from the registry
    /// regardless of whether the loop stops in time.
    async fn retire_active(&self) {
        let active = self.current.write().unwrap().take();
        let Some(active) = active else {
            return;
        };
        warn!("Stopping existing session {}", active.session.id());
        self.finish_stop(active).await;
    }

    /// Shared teardown once a session has been taken out of the registry:
    /// cancel, join within the timeout, mark stopped, snapshot.
    async fn finish_stop(&self, mut active: ActiveSession) -> StoppedSession {
        active.session.cancel();
        self.join_loop(&mut active).await;
        active.session.set_recording(false);

        StoppedSession {
            session_id: active.session.id().to_string(),
            transcript: active.session.transcript_snapshot(),
        }
    }

    async fn join_loop(&self, active: &mut ActiveSession) {
        let Some(handle) = active.handle.take() else {
            return;
        };
        match tokio::time::timeout(self.join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(
                    "Capture loop for session {} panicked: {}",
                    active.session.id(),
                    e
                );
            }
            Err(_) => {
                warn!(
                    "Capture loop for session {} did not stop within {:?}; abandoning",
                    active.session.id(),
                    self.join_timeout
                );
            }
        }
    }
}
