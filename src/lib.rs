//! Mentor Gateway - voice coding mentor backend with live workspace context
//!
//! This library provides the core functionality for the mentor gateway:
//! - Workspace watching and a bounded store of recently edited source files
//! - Fan-out of file updates to every connected chat session
//! - Socratic mentor chat over WebSocket, backed by an OpenAI-compatible LLM
//! - Speech synthesis and Python test-case execution
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 Browser editor UI                    │
//! │     /ws chat   │   /tts   │   /execute   │ /health   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Mentor Gateway                      │
//! │  Sessions │ Broadcast │ Context store │ Watcher      │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Providers                          │
//! │   NVIDIA NIM (LLM) │ OpenAI / ElevenLabs (TTS)       │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod gateway;
pub mod sessions;
pub mod voice;

pub use chat::{
    ChatModel, ChatServices, ChatSession, CompletionRequest, NimClient, Turn, WsIncoming,
    WsOutgoing,
};
pub use config::Config;
pub use context::{ContextStore, TrackedFile, WorkspaceWatcher};
pub use error::{Error, Result};
pub use exec::{CodeRunner, ExecutionReport, TestCase, TestResult};
pub use gateway::Gateway;
pub use sessions::{BroadcastDispatcher, SessionRegistry};
pub use voice::TextToSpeech;
