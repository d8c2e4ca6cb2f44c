//! Mentor chat over WebSocket
//!
//! Wire protocol, prompt assembly, the LLM seam and the per-connection
//! session state machine.

mod llm;
mod prompt;
mod protocol;
mod session;

pub use llm::{ChatModel, CompletionRequest, DEFAULT_BASE_URL, DEFAULT_MODEL, NimClient, Turn};
pub use prompt::{ChatMessage, MENTOR_SYSTEM_PROMPT, Role, build_messages};
pub use protocol::{WsIncoming, WsOutgoing};
pub use session::{ChatServices, ChatSession, DEFAULT_HISTORY_WINDOW};
