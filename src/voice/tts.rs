//! Text-to-speech (TTS) processing
//!
//! The OpenAI speech API is tried first and returns buffered MP3. ElevenLabs
//! is the fallback and streams its MP3 body straight through.

use std::time::Duration;

use axum::body::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

const OPENAI_SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const ELEVENLABS_TIMEOUT: Duration = Duration::from_secs(30);

/// Default `OpenAI` TTS model
pub const DEFAULT_OPENAI_MODEL: &str = "tts-1";

/// Default `OpenAI` voice
pub const DEFAULT_OPENAI_VOICE: &str = "alloy";

/// Audio payload, either fully buffered or streamed from upstream
pub enum AudioBody {
    Bytes(Vec<u8>),
    Stream(BoxStream<'static, reqwest::Result<Bytes>>),
}

impl std::fmt::Debug for AudioBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Synthesized audio and its content type
#[derive(Debug)]
pub struct SpeechAudio {
    pub body: AudioBody,
    pub mime: &'static str,
}

struct OpenAiVoice {
    api_key: SecretString,
    model: String,
    voice: String,
    speed: f32,
}

struct ElevenLabsVoice {
    api_key: SecretString,
    voice_id: Option<String>,
    base_url: String,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    primary: Option<OpenAiVoice>,
    fallback: Option<ElevenLabsVoice>,
}

impl Default for TextToSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextToSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextToSpeech")
            .field("openai", &self.primary.is_some())
            .field("elevenlabs", &self.fallback.is_some())
            .finish()
    }
}

impl TextToSpeech {
    /// Create a TTS instance with no providers configured
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            primary: None,
            fallback: None,
        }
    }

    /// Use `OpenAI` as the primary provider
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn set_openai(
        &mut self,
        api_key: String,
        model: String,
        voice: String,
        speed: f32,
    ) -> Result<()> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        self.primary = Some(OpenAiVoice {
            api_key: SecretString::from(api_key),
            model,
            voice,
            speed,
        });
        Ok(())
    }

    /// Use ElevenLabs as the fallback provider
    ///
    /// `voice_id` is the default voice; callers may override it per request.
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn set_elevenlabs(&mut self, api_key: String, voice_id: Option<String>) -> Result<()> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        self.fallback = Some(ElevenLabsVoice {
            api_key: SecretString::from(api_key),
            voice_id: voice_id.filter(|v| !v.is_empty()),
            base_url: ELEVENLABS_BASE_URL.to_string(),
        });
        Ok(())
    }

    /// Whether the primary provider is configured
    #[must_use]
    pub const fn openai_configured(&self) -> bool {
        self.primary.is_some()
    }

    /// Whether the fallback provider is configured
    #[must_use]
    pub const fn elevenlabs_configured(&self) -> bool {
        self.fallback.is_some()
    }

    /// Whether any provider is configured
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.openai_configured() || self.elevenlabs_configured()
    }

    /// Synthesize text to speech
    ///
    /// `voice_id` selects the ElevenLabs voice; the primary provider uses its
    /// configured voice.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no provider can serve the request, or
    /// `Error::Provider` if the upstream call fails
    pub async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Result<SpeechAudio> {
        if !self.is_configured() {
            return Err(Error::Config("No TTS service configured".to_string()));
        }

        if let Some(primary) = &self.primary {
            match self.synthesize_openai(primary, text).await {
                Ok(audio) => {
                    return Ok(SpeechAudio {
                        body: AudioBody::Bytes(audio),
                        mime: "audio/mpeg",
                    });
                }
                Err(e) if self.fallback.is_some() => {
                    tracing::warn!(error = %e, "OpenAI TTS failed, falling back to ElevenLabs");
                }
                Err(e) => return Err(e),
            }
        }

        let Some(fallback) = &self.fallback else {
            return Err(Error::Config("No TTS service configured".to_string()));
        };

        let stream = self.synthesize_elevenlabs(fallback, text, voice_id).await?;
        Ok(SpeechAudio {
            body: AudioBody::Stream(stream),
            mime: "audio/mpeg",
        })
    }

    async fn synthesize_openai(&self, voice: &OpenAiVoice, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &voice.model,
            input: text,
            voice: &voice.voice,
            speed: voice.speed,
        };

        let response = self
            .client
            .post(OPENAI_SPEECH_URL)
            .bearer_auth(voice.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("OpenAI TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Provider(format!("OpenAI TTS body failed: {e}")))?;
        Ok(audio.to_vec())
    }

    async fn synthesize_elevenlabs(
        &self,
        voice: &ElevenLabsVoice,
        text: &str,
        voice_id: Option<&str>,
    ) -> Result<BoxStream<'static, reqwest::Result<Bytes>>> {
        let chosen = voice_id
            .filter(|v| !v.is_empty())
            .or(voice.voice_id.as_deref())
            .ok_or_else(|| {
                Error::Config(
                    "No ElevenLabs voice id provided. Set ELEVENLABS_VOICE_ID or pass voice_id."
                        .to_string(),
                )
            })?;

        let url = format!("{}/{chosen}/stream", voice.base_url);
        let request = elevenlabs_request(text);

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", voice.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .timeout(ELEVENLABS_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Provider(format!("ElevenLabs TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "ElevenLabs TTS error {status}: {body}"
            )));
        }

        Ok(response.bytes_stream().boxed())
    }
}

#[derive(Debug, serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Debug, serde::Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    speed: f32,
    style: f32,
}

const fn elevenlabs_request(text: &str) -> ElevenLabsRequest<'_> {
    ElevenLabsRequest {
        text,
        voice_settings: VoiceSettings {
            stability: 0.3,
            similarity_boost: 0.7,
            speed: 1.1,
            style: 0.2,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_is_config_error() {
        let err = TextToSpeech::new().synthesize("hi", None).await.unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg == "No TTS service configured"));
    }

    #[tokio::test]
    async fn fallback_without_voice_is_config_error() {
        let mut tts = TextToSpeech::new();
        tts.set_elevenlabs("key".to_string(), None).unwrap();
        let err = tts.synthesize("hi", None).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_keys_rejected() {
        let mut tts = TextToSpeech::new();
        assert!(tts
            .set_openai(String::new(), "tts-1".into(), "alloy".into(), 1.0)
            .is_err());
        assert!(tts.set_elevenlabs(String::new(), None).is_err());
        assert!(!tts.is_configured());
    }

    #[test]
    fn elevenlabs_payload_carries_voice_settings() {
        let json = serde_json::to_value(elevenlabs_request("hello")).unwrap();
        assert_eq!(json["text"], "hello");
        assert_eq!(json["voice_settings"]["similarity_boost"].as_f64(), Some(0.7_f32.into()));
    }
}
