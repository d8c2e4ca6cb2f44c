//! Code execution endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Deserialize;

use super::{ApiError, ApiState};
use crate::exec::{ExecutionReport, TestCase};

/// Build execute router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .with_state(state)
}

/// Execution request
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

fn default_language() -> String {
    "python".to_string()
}

/// Run submitted code against its test cases
async fn execute(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionReport>, ExecuteError> {
    if request.language != "python" {
        return Err(ExecuteError::UnsupportedLanguage);
    }

    let report = state
        .runner
        .run(&request.code, &request.test_cases)
        .await
        .map_err(|e| ExecuteError::Failed(e.to_string()))?;

    tracing::info!(
        total = report.total_tests,
        passed = report.passed_tests,
        "code execution finished"
    );

    Ok(Json(report))
}

/// Execute API errors
#[derive(Debug)]
pub enum ExecuteError {
    UnsupportedLanguage,
    Failed(String),
}

impl IntoResponse for ExecuteError {
    fn into_response(self) -> Response {
        match self {
            Self::UnsupportedLanguage => ApiError::new(
                StatusCode::BAD_REQUEST,
                "unsupported_language",
                "Only Python is supported currently",
            ),
            Self::Failed(msg) => {
                tracing::error!(error = %msg, "code execution failed");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "execution_failed", msg)
            }
        }
        .into_response()
    }
}
