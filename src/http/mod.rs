//! HTTP API server for external control
//!
//! This module provides the REST and WebSocket surface over the session
//! engine:
//! - POST /audio/start - Start a recording session (stops any existing one)
//! - POST /audio/stop - Stop the active session and return its transcript
//! - GET /audio/status - Query session status
//! - GET /audio/stream - WebSocket push channel for live transcriptions
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
