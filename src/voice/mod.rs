//! Voice output for mentor replies
//!
//! Speech synthesis only; the browser handles capture and playback.

mod tts;

pub use tts::{AudioBody, DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_VOICE, SpeechAudio, TextToSpeech};
