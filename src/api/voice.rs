//! Text-to-speech endpoint for spoken mentor replies

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::Error;
use crate::voice::AudioBody;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/tts", post(synthesize))
        .with_state(state)
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    /// ElevenLabs voice override
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Synthesize text to speech
///
/// Returns MP3, buffered from the primary provider or streamed from the
/// fallback
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Response, VoiceError> {
    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("Empty text"));
    }

    let audio = state
        .tts
        .synthesize(&request.text, request.voice_id.as_deref())
        .await
        .map_err(VoiceError::from)?;

    let body = match audio.body {
        AudioBody::Bytes(bytes) => Body::from(bytes),
        AudioBody::Stream(stream) => Body::from_stream(stream),
    };

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, audio.mime)], body).into_response())
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    NotConfigured(String),
    BadRequest(&'static str),
    SynthesisFailed(String),
}

impl From<Error> for VoiceError {
    fn from(e: Error) -> Self {
        match e {
            Error::Config(msg) => Self::NotConfigured(msg),
            other => Self::SynthesisFailed(other.to_string()),
        }
    }
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        let err = match self {
            Self::NotConfigured(msg) => {
                ApiError::new(StatusCode::BAD_REQUEST, "not_configured", msg)
            }
            Self::BadRequest(msg) => ApiError::new(StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::SynthesisFailed(msg) => {
                tracing::warn!(error = %msg, "speech synthesis failed");
                ApiError::new(StatusCode::BAD_GATEWAY, "synthesis_failed", msg)
            }
        };
        err.into_response()
    }
}
