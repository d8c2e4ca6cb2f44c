//! HTTP API server for the mentor gateway

pub mod execute;
pub mod health;
pub mod voice;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::chat::{ChatModel, ChatServices, DEFAULT_HISTORY_WINDOW};
use crate::config::DEFAULT_PORT;
use crate::context::ContextStore;
use crate::exec::CodeRunner;
use crate::sessions::SessionRegistry;
use crate::voice::TextToSpeech;
use crate::Result;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<ContextStore>,
    pub registry: Arc<SessionRegistry>,
    pub chat: ChatServices,
    pub tts: Arc<TextToSpeech>,
    pub runner: CodeRunner,
    /// Set once the workspace watcher is running
    pub watching: Arc<AtomicBool>,
}

impl ApiState {
    /// Whether the workspace watcher is running
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Relaxed)
    }
}

/// Error body shared by the HTTP routes: `{"error": {"code", "message"}}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        (
            self.status,
            axum::Json(ErrorResponse {
                error: ErrorBody {
                    code: self.code,
                    message: self.message,
                },
            }),
        )
            .into_response()
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    store: Arc<ContextStore>,
    registry: Arc<SessionRegistry>,
    port: u16,
    llm: Option<Arc<dyn ChatModel>>,
    system_prompt: Option<String>,
    history_window: usize,
    tts: TextToSpeech,
    runner: CodeRunner,
    static_dir: Option<PathBuf>,
    watching: Arc<AtomicBool>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub fn new(store: Arc<ContextStore>, registry: Arc<SessionRegistry>) -> Self {
        Self {
            store,
            registry,
            port: DEFAULT_PORT,
            llm: None,
            system_prompt: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            tts: TextToSpeech::new(),
            runner: CodeRunner::default(),
            static_dir: None,
            watching: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set the port
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the LLM used for mentor replies
    #[must_use]
    pub fn llm(mut self, llm: Arc<dyn ChatModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Replace the built-in mentor prompt
    #[must_use]
    pub fn system_prompt(mut self, prompt: String) -> Self {
        self.system_prompt = Some(prompt);
        self
    }

    /// Set how many past turns go with each request
    #[must_use]
    pub const fn history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Set the speech synthesizer
    #[must_use]
    pub fn tts(mut self, tts: TextToSpeech) -> Self {
        self.tts = tts;
        self
    }

    /// Set the code runner
    #[must_use]
    pub fn runner(mut self, runner: CodeRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Set static files directory for web UI
    #[must_use]
    pub fn static_dir(mut self, dir: PathBuf) -> Self {
        self.static_dir = Some(dir);
        self
    }

    /// Share the watcher-running flag with the gateway
    #[must_use]
    pub fn watching(mut self, flag: Arc<AtomicBool>) -> Self {
        self.watching = flag;
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let mut chat = ChatServices::new(Arc::clone(&self.store), self.llm);
        chat.history_window = self.history_window;
        if let Some(prompt) = self.system_prompt {
            chat.system_prompt = Arc::from(prompt);
        }

        let state = Arc::new(ApiState {
            store: self.store,
            registry: self.registry,
            chat,
            tts: Arc::new(self.tts),
            runner: self.runner,
            watching: self.watching,
        });

        ApiServer {
            state,
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// HTTP API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Shared handler state
    #[must_use]
    pub const fn state(&self) -> &Arc<ApiState> {
        &self.state
    }

    /// Build the full router
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(websocket::router(self.state.clone()))
            .merge(voice::router(self.state.clone()))
            .merge(execute::router(self.state.clone()))
            .merge(health::router(self.state.clone()));

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from the editor UI
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to start
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Spawn the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}
