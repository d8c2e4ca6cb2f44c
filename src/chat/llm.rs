//! LLM collaborator
//!
//! [`ChatModel`] is the seam the session handler talks to. [`NimClient`]
//! implements it against an OpenAI-compatible chat-completions endpoint
//! (NVIDIA NIM by default).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::prompt::{ChatMessage, build_messages};
use crate::{Error, Result};

/// Default NIM endpoint
pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "meta/llama-3.1-70b-instruct";

/// One completed exchange in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// Everything a model needs to produce the next reply
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub history: &'a [Turn],
    /// Rendered code context; empty means none
    pub context: &'a str,
    pub user_text: &'a str,
}

/// A language model that can answer a mentor turn
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for health reporting
    fn model_id(&self) -> &str;

    /// Produce the assistant reply
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` if the upstream call fails
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// OpenAI-compatible chat-completions client
pub struct NimClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl std::fmt::Debug for NimClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NimClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl NimClient {
    /// Create a client for `model`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("NVIDIA_API_KEY is not set".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: SecretString::from(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
            temperature: 0.5,
            max_tokens: 150,
        })
    }

    /// Override the endpoint base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override sampling temperature and reply length
    #[must_use]
    pub const fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatModel for NimClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = CompletionBody {
            model: &self.model,
            messages: build_messages(request),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            history = request.history.len(),
            context_chars = request.context.len(),
            "requesting completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("LLM error {status}: {body}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("invalid LLM response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::Provider("LLM returned an empty reply".to_string()))
    }
}
