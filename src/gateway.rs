//! Gateway lifecycle: builds the shared pieces once and runs until Ctrl-C

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::{ApiServer, ApiServerBuilder};
use crate::chat::{ChatModel, NimClient};
use crate::context::{ContextStore, WorkspaceWatcher};
use crate::exec::CodeRunner;
use crate::sessions::{BroadcastDispatcher, SessionRegistry};
use crate::voice::TextToSpeech;
use crate::{Config, Result};

/// The running mentor gateway
pub struct Gateway {
    config: Config,
    store: Arc<ContextStore>,
    registry: Arc<SessionRegistry>,
    dispatcher: Arc<BroadcastDispatcher>,
    watching: Arc<AtomicBool>,
}

impl Gateway {
    /// Create the gateway and its shared state
    #[must_use]
    pub fn new(config: Config) -> Self {
        let store = Arc::new(ContextStore::new(
            config.workspace.max_files,
            config.workspace.max_file_chars,
        ));
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            Arc::clone(&registry),
            config.server.broadcast_capacity,
        ));

        Self {
            config,
            store,
            registry,
            dispatcher,
            watching: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared context store
    #[must_use]
    pub const fn store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Shared session registry
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Build the API server from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the configured system prompt file cannot be read
    pub fn api_server(&self) -> Result<ApiServer> {
        let mut builder = ApiServerBuilder::new(Arc::clone(&self.store), Arc::clone(&self.registry))
            .port(self.config.server.port)
            .history_window(self.config.llm.history_window)
            .tts(self.build_tts())
            .runner(self.build_runner())
            .watching(Arc::clone(&self.watching));

        if let Some(llm) = self.build_llm() {
            builder = builder.llm(llm);
        }
        if let Some(prompt) = self.config.llm.load_system_prompt()? {
            builder = builder.system_prompt(prompt);
        }
        if let Some(dir) = &self.config.server.static_dir {
            builder = builder.static_dir(dir.clone());
        }

        Ok(builder.build())
    }

    fn build_llm(&self) -> Option<Arc<dyn ChatModel>> {
        let Some(key) = self.config.llm.api_key.clone() else {
            tracing::warn!("NVIDIA_API_KEY not set, mentor replies disabled");
            return None;
        };

        match NimClient::new(key, self.config.llm.model.clone()) {
            Ok(client) => {
                tracing::info!(model = %self.config.llm.model, "LLM configured");
                Some(Arc::new(client.with_base_url(self.config.llm.base_url.clone())))
            }
            Err(e) => {
                tracing::warn!(error = %e, "LLM unavailable");
                None
            }
        }
    }

    fn build_runner(&self) -> CodeRunner {
        let runner = CodeRunner::new(
            self.config.exec.python.clone(),
            Duration::from_secs(self.config.exec.timeout_secs),
        );
        if !runner.interpreter_available() {
            tracing::warn!(
                interpreter = runner.interpreter(),
                "interpreter not found on PATH, /execute cases will fail"
            );
        }
        runner
    }

    fn build_tts(&self) -> TextToSpeech {
        let voice = &self.config.voice;
        let mut tts = TextToSpeech::new();

        if let Some(key) = voice.openai_api_key.clone()
            && let Err(e) = tts.set_openai(
                key,
                voice.tts_model.clone(),
                voice.tts_voice.clone(),
                voice.tts_speed,
            )
        {
            tracing::warn!(error = %e, "OpenAI TTS unavailable");
        }

        if let Some(key) = voice.elevenlabs_api_key.clone()
            && let Err(e) = tts.set_elevenlabs(key, voice.elevenlabs_voice_id.clone())
        {
            tracing::warn!(error = %e, "ElevenLabs TTS unavailable");
        }

        if !tts.is_configured() {
            tracing::warn!("no TTS provider configured, /tts will reject requests");
        }
        tts
    }

    fn start_watcher(&self) -> Option<WorkspaceWatcher> {
        let root = &self.config.workspace.dir;
        if !root.is_dir() {
            tracing::warn!(
                root = %root.display(),
                "workspace directory does not exist, file watching disabled"
            );
            return None;
        }

        match WorkspaceWatcher::start(root, Arc::clone(&self.store), Arc::clone(&self.dispatcher)) {
            Ok(watcher) => {
                self.watching.store(true, Ordering::Relaxed);
                Some(watcher)
            }
            Err(e) => {
                tracing::error!(root = %root.display(), error = %e, "failed to watch workspace");
                None
            }
        }
    }

    /// Run the gateway until interrupted
    ///
    /// # Errors
    ///
    /// Returns error if the API server cannot be built or fails
    pub async fn run(self) -> Result<()> {
        let server = self.api_server()?;
        let dispatch_task = self.dispatcher.spawn();
        let watcher = self.start_watcher();

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let mut server_task = server.spawn();
        tracing::info!(
            port = self.config.server.port,
            workspace = %self.config.workspace.dir.display(),
            "mentor gateway ready"
        );

        let result = tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("shutdown requested");
                server_task.abort();
                Ok(())
            }
            res = &mut server_task => match res {
                Ok(inner) => inner,
                Err(e) => Err(crate::Error::Config(format!("API server task failed: {e}"))),
            },
        };

        if let Some(watcher) = watcher {
            watcher.stop();
            self.watching.store(false, Ordering::Relaxed);
        }
        dispatch_task.abort();

        tracing::info!("gateway stopped");
        result
    }
}
