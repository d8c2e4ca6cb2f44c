//! Configuration management for the mentor gateway
//!
//! Every setting resolves as environment variable, then the TOML file, then
//! the built-in default.

pub mod file;

use std::path::PathBuf;
use std::str::FromStr;

use crate::chat::{DEFAULT_BASE_URL, DEFAULT_HISTORY_WINDOW, DEFAULT_MODEL};
use crate::context::{DEFAULT_MAX_FILE_CHARS, DEFAULT_MAX_FILES};
use crate::exec::{DEFAULT_INTERPRETER, DEFAULT_TIMEOUT_SECS};
use crate::sessions::DEFAULT_QUEUE_CAPACITY;
use crate::voice::{DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_VOICE};
use crate::{Error, Result};

pub use file::MentorConfigFile;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// Mentor gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub voice: VoiceConfig,
    pub exec: ExecConfig,
}

/// Watched workspace and context limits
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Root directory to watch
    pub dir: PathBuf,

    /// Maximum number of tracked files
    pub max_files: usize,

    /// Characters kept per file before truncation
    pub max_file_chars: usize,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,

    /// Pending file-change updates held before the oldest is dropped
    pub broadcast_capacity: usize,
}

/// LLM provider configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// `None` disables mentor replies
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub history_window: usize,
    pub system_prompt_file: Option<PathBuf>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("history_window", &self.history_window)
            .field("system_prompt_file", &self.system_prompt_file)
            .finish()
    }
}

impl LlmConfig {
    /// Read the system prompt override, if one is configured
    ///
    /// # Errors
    ///
    /// Returns error if the configured file cannot be read or is blank
    pub fn load_system_prompt(&self) -> Result<Option<String>> {
        let Some(path) = &self.system_prompt_file else {
            return Ok(None);
        };

        let prompt = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read system prompt {}: {e}",
                path.display()
            ))
        })?;

        if prompt.trim().is_empty() {
            return Err(Error::Config(format!(
                "system prompt {} is empty",
                path.display()
            )));
        }

        Ok(Some(prompt))
    }
}

/// Speech synthesis configuration
#[derive(Clone)]
pub struct VoiceConfig {
    /// Primary provider key
    pub openai_api_key: Option<String>,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_speed: f32,

    /// Fallback provider key
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("tts_model", &self.tts_model)
            .field("tts_voice", &self.tts_voice)
            .field("tts_speed", &self.tts_speed)
            .field(
                "elevenlabs_api_key",
                &self.elevenlabs_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("elevenlabs_voice_id", &self.elevenlabs_voice_id)
            .finish()
    }
}

/// Code execution configuration
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Interpreter binary or path
    pub python: String,

    /// Wall-clock limit per test case
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from the environment and the TOML file
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value is out of range
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::resolve(|key| std::env::var(key).ok(), fc)
    }

    /// Resolve configuration from an environment lookup and a parsed file
    ///
    /// Empty environment values count as unset.
    ///
    /// # Errors
    ///
    /// Returns error if a resolved value is out of range
    pub fn resolve<E>(env: E, fc: MentorConfigFile) -> Result<Self>
    where
        E: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        // Workspace (env > toml > current directory)
        let workspace = WorkspaceConfig {
            dir: env("WORKSPACE_DIR")
                .map(PathBuf::from)
                .or(fc.workspace.dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            max_files: parsed(&env, "MENTOR_MAX_CONTEXT_FILES")
                .or(fc.workspace.max_files)
                .unwrap_or(DEFAULT_MAX_FILES),
            max_file_chars: parsed(&env, "MENTOR_MAX_FILE_CHARS")
                .or(fc.workspace.max_file_chars)
                .unwrap_or(DEFAULT_MAX_FILE_CHARS),
        };

        // API server (env > toml > default)
        let server = ServerConfig {
            port: parsed(&env, "MENTOR_PORT")
                .or_else(|| parsed(&env, "PORT"))
                .or(fc.server.port)
                .unwrap_or(DEFAULT_PORT),
            static_dir: env("MENTOR_STATIC_DIR")
                .map(PathBuf::from)
                .or(fc.server.static_dir),
            broadcast_capacity: parsed(&env, "MENTOR_BROADCAST_CAPACITY")
                .or(fc.server.broadcast_capacity)
                .unwrap_or(DEFAULT_QUEUE_CAPACITY),
        };

        let llm = LlmConfig {
            api_key: env("NVIDIA_API_KEY").or(fc.llm.api_key),
            model: env("NVIDIA_MODEL")
                .or(fc.llm.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: env("NVIDIA_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            history_window: parsed(&env, "MENTOR_HISTORY_WINDOW")
                .or(fc.llm.history_window)
                .unwrap_or(DEFAULT_HISTORY_WINDOW),
            system_prompt_file: env("MENTOR_SYSTEM_PROMPT_FILE")
                .map(PathBuf::from)
                .or(fc.llm.system_prompt_file),
        };

        let voice = VoiceConfig {
            openai_api_key: env("OPENAI_API_KEY").or(fc.voice.openai_api_key),
            tts_model: env("MENTOR_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            tts_voice: env("MENTOR_TTS_VOICE")
                .or(fc.voice.tts_voice)
                .unwrap_or_else(|| DEFAULT_OPENAI_VOICE.to_string()),
            tts_speed: fc.voice.tts_speed.unwrap_or(1.0),
            elevenlabs_api_key: env("ELEVENLABS_API_KEY").or(fc.voice.elevenlabs_api_key),
            elevenlabs_voice_id: env("ELEVENLABS_VOICE_ID").or(fc.voice.elevenlabs_voice_id),
        };

        let exec = ExecConfig {
            python: env("MENTOR_PYTHON")
                .or(fc.exec.python)
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            timeout_secs: parsed(&env, "MENTOR_EXEC_TIMEOUT_SECS")
                .or(fc.exec.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        let config = Self {
            workspace,
            server,
            llm,
            voice,
            exec,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.workspace.max_files == 0 {
            return Err(Error::Config("max context files must be at least 1".to_string()));
        }
        if self.server.broadcast_capacity == 0 {
            return Err(Error::Config("broadcast capacity must be at least 1".to_string()));
        }
        if self.exec.timeout_secs == 0 {
            return Err(Error::Config("execution timeout must be at least 1s".to_string()));
        }
        Ok(())
    }
}

/// Parse an environment value, ignoring (with a warning) values that don't parse
fn parsed<T, E>(env: &E, key: &str) -> Option<T>
where
    T: FromStr,
    E: Fn(&str) -> Option<String>,
{
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
