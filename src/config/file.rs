//! TOML configuration file loading
//!
//! Supports `~/.config/mentor/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MentorConfigFile {
    /// Watched workspace and context limits
    #[serde(default)]
    pub workspace: WorkspaceFileConfig,

    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// LLM configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Speech synthesis configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Code execution configuration
    #[serde(default)]
    pub exec: ExecFileConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceFileConfig {
    pub dir: Option<PathBuf>,
    pub max_files: Option<usize>,
    pub max_file_chars: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Static web UI directory
    pub static_dir: Option<PathBuf>,

    /// Pending file-change updates held for broadcast
    pub broadcast_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    pub api_key: Option<String>,

    /// Model identifier (e.g. "meta/llama-3.1-70b-instruct")
    pub model: Option<String>,

    pub base_url: Option<String>,

    /// Past turns sent with each request
    pub history_window: Option<usize>,

    /// File whose contents replace the built-in mentor prompt
    pub system_prompt_file: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    pub openai_api_key: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "alloy")
    pub tts_voice: Option<String>,

    pub tts_speed: Option<f32>,

    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecFileConfig {
    /// Interpreter binary (e.g. "python3")
    pub python: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MentorConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> MentorConfigFile {
    let Some(path) = config_file_path() else {
        return MentorConfigFile::default();
    };

    if !path.exists() {
        return MentorConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MentorConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MentorConfigFile::default()
        }
    }
}

/// Parse config file contents
///
/// # Errors
///
/// Returns error if the TOML is malformed or a field has the wrong type
pub fn parse_config(content: &str) -> crate::Result<MentorConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Return the config file path: `~/.config/mentor/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("mentor").join("config.toml"))
}
