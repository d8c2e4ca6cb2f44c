//! Chat channel message framing

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Incoming WebSocket message from client
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsIncoming {
    /// Ask the mentor something
    UserMessage {
        #[serde(default)]
        text: Option<String>,
        /// Explicit code context; overrides the tracked workspace files
        #[serde(default)]
        code_context: Option<String>,
    },
    /// Ask for the current tracked files and rendered context
    RequestContext,
    /// Ping to keep connection alive
    Ping,
    /// Any other `type` value
    #[serde(other)]
    Unsupported,
}

/// Outgoing WebSocket message to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsOutgoing {
    /// Progress indicator (e.g. "thinking")
    Status { message: String },
    /// Error occurred; the session stays open
    Error { code: String, message: String },
    /// Mentor reply
    LlmMessage { text: String },
    /// Full view of the tracked files
    ContextSync { files: Vec<String>, context: String },
    /// A tracked file was written
    ContextUpdate {
        filename: String,
        content: String,
        timestamp: String,
    },
    /// A tracked file left the context (deleted, renamed away or evicted)
    ContextRemoved { filename: String, timestamp: String },
    /// Pong response
    Pong,
}

impl WsOutgoing {
    /// Build an error event
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    /// Build a `context_update` event
    #[must_use]
    pub fn context_update(filename: String, content: String, at: DateTime<Utc>) -> Self {
        Self::ContextUpdate {
            filename,
            content,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Build a `context_removed` event
    #[must_use]
    pub fn context_removed(filename: String, at: DateTime<Utc>) -> Self {
        Self::ContextRemoved {
            filename,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
