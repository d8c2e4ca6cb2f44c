//! Error types for the mentor gateway

use thiserror::Error;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the mentor gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration (e.g. provider credentials)
    #[error("configuration error: {0}")]
    Config(String),

    /// Upstream LLM or TTS failure
    #[error("provider error: {0}")]
    Provider(String),

    /// Unreadable or undecodable workspace file
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// A code-execution test case exceeded its wall-clock budget
    #[error("execution timed out after {0}s")]
    ExecutionTimeout(u64),

    /// Bad chat frame or empty message; `code` is echoed to the client
    #[error("malformed input: {message}")]
    MalformedInput { code: &'static str, message: String },

    /// The peer side of a session channel has gone away
    #[error("session channel closed")]
    ChannelClosed,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Filesystem watcher error
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl Error {
    /// Shorthand for a [`Error::MalformedInput`]
    #[must_use]
    pub fn malformed(code: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            code,
            message: message.into(),
        }
    }
}
