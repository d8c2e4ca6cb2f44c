//! Health check endpoint

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub llm_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
    pub openai_tts_configured: bool,
    pub elevenlabs_configured: bool,
    /// Whether the code runner's interpreter is on `PATH`
    pub python_available: bool,
    pub workspace_watched: bool,
    pub tracked_files: usize,
    pub sessions: usize,
}

/// Liveness plus provider configuration
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let llm = state.chat.llm.as_ref();

    Json(HealthResponse {
        status: "healthy",
        service: "mentor-gateway",
        version: env!("CARGO_PKG_VERSION"),
        llm_configured: llm.is_some(),
        llm_model: llm.map(|m| m.model_id().to_string()),
        openai_tts_configured: state.tts.openai_configured(),
        elevenlabs_configured: state.tts.elevenlabs_configured(),
        python_available: state.runner.interpreter_available(),
        workspace_watched: state.is_watching(),
        tracked_files: state.store.len(),
        sessions: state.registry.len().await,
    })
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}
