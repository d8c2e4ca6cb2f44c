//! Per-connection mentor conversation
//!
//! A [`ChatSession`] owns one connection's history and turns inbound frames
//! into outbound events. Every per-frame failure is reported to the client as
//! an `error` event; only a closed outbound channel ends the session.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::llm::{ChatModel, CompletionRequest, Turn};
use super::protocol::{WsIncoming, WsOutgoing};
use crate::context::{self, ContextStore};
use crate::sessions::SessionId;
use crate::{Error, Result};

/// Default number of past turns sent with each completion
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Shared collaborators every session needs
#[derive(Clone)]
pub struct ChatServices {
    pub store: Arc<ContextStore>,
    /// `None` when no LLM provider is configured
    pub llm: Option<Arc<dyn ChatModel>>,
    pub system_prompt: Arc<str>,
    pub history_window: usize,
}

impl ChatServices {
    /// Services with the default prompt and history window
    #[must_use]
    pub fn new(store: Arc<ContextStore>, llm: Option<Arc<dyn ChatModel>>) -> Self {
        Self {
            store,
            llm,
            system_prompt: Arc::from(super::MENTOR_SYSTEM_PROMPT),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

/// One connected chat session
pub struct ChatSession {
    id: SessionId,
    history: Vec<Turn>,
    services: ChatServices,
    tx: mpsc::Sender<WsOutgoing>,
}

impl ChatSession {
    /// Create a session that writes its events to `tx`
    #[must_use]
    pub const fn new(id: SessionId, services: ChatServices, tx: mpsc::Sender<WsOutgoing>) -> Self {
        Self {
            id,
            history: Vec::new(),
            services,
            tx,
        }
    }

    /// Session identifier
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Completed turns so far
    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Send the existing context right after connect, if there is any
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if the client is gone
    pub async fn on_connect(&self) -> Result<()> {
        if self.services.store.is_empty() {
            return Ok(());
        }
        self.send_context_sync().await
    }

    /// Handle one inbound text frame
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if the client is gone; all other
    /// failures are reported to the client and return `Ok`
    pub async fn handle_frame(&mut self, text: &str) -> Result<()> {
        let incoming = match parse_frame(text) {
            Ok(incoming) => incoming,
            Err(err) => return self.reject(err).await,
        };

        match incoming {
            WsIncoming::UserMessage { text, code_context } => {
                self.handle_user_message(text.as_deref().unwrap_or_default(), code_context)
                    .await
            }
            WsIncoming::RequestContext => self.send_context_sync().await,
            WsIncoming::Ping => self.send(WsOutgoing::Pong).await,
            WsIncoming::Unsupported => {
                self.reject(Error::malformed("unsupported_type", "Unsupported message type."))
                    .await
            }
        }
    }

    /// Handle a binary frame, which the protocol has no use for
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` if the client is gone
    pub async fn handle_binary(&self) -> Result<()> {
        self.reject(Error::malformed("unsupported_type", "Unsupported message type."))
            .await
    }

    async fn handle_user_message(
        &mut self,
        text: &str,
        code_context: Option<String>,
    ) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return self
                .reject(Error::malformed("empty_message", "Empty message."))
                .await;
        }

        self.send(WsOutgoing::Status {
            message: "thinking".to_string(),
        })
        .await?;

        let context = match code_context.filter(|c| !c.trim().is_empty()) {
            Some(explicit) => explicit,
            None => context::render(&self.services.store.snapshot()),
        };

        match self.complete(text, &context).await {
            Ok(reply) => {
                self.history.push(Turn {
                    user: text.to_string(),
                    assistant: reply.clone(),
                });
                self.send(WsOutgoing::LlmMessage { text: reply }).await
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "mentor reply failed");
                self.send(WsOutgoing::error("llm_error", e.to_string())).await
            }
        }
    }

    async fn complete(&self, text: &str, context: &str) -> Result<String> {
        let llm = self.services.llm.as_ref().ok_or_else(|| {
            Error::Provider("LLM provider not configured (NVIDIA_API_KEY is not set)".to_string())
        })?;

        let start = self
            .history
            .len()
            .saturating_sub(self.services.history_window);
        let request = CompletionRequest {
            system_prompt: &self.services.system_prompt,
            history: &self.history[start..],
            context,
            user_text: text,
        };

        llm.complete(&request).await
    }

    async fn send_context_sync(&self) -> Result<()> {
        let (files, context) = context::sync_view(&self.services.store);
        self.send(WsOutgoing::ContextSync { files, context }).await
    }

    /// Report malformed input to the client; anything else propagates
    async fn reject(&self, err: Error) -> Result<()> {
        match err {
            Error::MalformedInput { code, message } => {
                tracing::debug!(session_id = %self.id, code, "rejected frame");
                self.send(WsOutgoing::error(code, message)).await
            }
            other => Err(other),
        }
    }

    async fn send(&self, event: WsOutgoing) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::ChannelClosed)
    }
}

/// Decode a frame
fn parse_frame(text: &str) -> Result<WsIncoming> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|_| Error::malformed("invalid_json", "Invalid JSON payload."))?;

    if !value.get("type").is_some_and(serde_json::Value::is_string) {
        return Err(Error::malformed("unsupported_type", "Unsupported message type."));
    }

    serde_json::from_value(value)
        .map_err(|e| Error::malformed("invalid_message", format!("Invalid message: {e}")))
}
