use anyhow::{bail, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use voicegate::audio::{AudioInputConfig, CpalInputFactory};
use voicegate::transcribe::{EngineFactory, StubEngineFactory, WhisperEngineFactory};
use voicegate::{create_router, AppState, Config, SessionManager};

#[derive(Debug, Parser)]
#[command(name = "voicegate", about = "Voice-activity-gated transcription service")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/voicegate")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let audio = AudioInputConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        frame_duration_ms: cfg.audio.frame_duration_ms,
    };

    let engine_factory: Arc<dyn EngineFactory> = match cfg.engine.backend.as_str() {
        "whisper" => Arc::new(WhisperEngineFactory::new(
            cfg.engine.model_path.clone(),
            cfg.engine.language.clone(),
        )),
        "stub" => Arc::new(StubEngineFactory),
        other => bail!("Unknown engine backend: {}", other),
    };

    let input_factory = Arc::new(CpalInputFactory::new(audio.clone()));
    let manager = Arc::new(SessionManager::new(engine_factory, input_factory, audio));
    let state = AppState::new(manager);

    let app = create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
