//! Text-to-audio generation.

mod stable_audio;

pub use stable_audio::{StableAudioClient, DEFAULT_STABLE_AUDIO_MODEL, DEFAULT_STABLE_AUDIO_URL};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp3,
    Wav,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
            OutputFormat::Wav => "wav",
        }
    }

    /// MIME type assumed when the upstream response carries none.
    pub fn default_mime(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mpeg",
            OutputFormat::Wav => "audio/wav",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp3" => Ok(OutputFormat::Mp3),
            "wav" => Ok(OutputFormat::Wav),
            other => Err(format!("Unsupported output format {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub duration_seconds: u32,
    pub output_format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct GeneratedAudio {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio generation is not configured: {0}")]
    NotConfigured(String),

    #[error("Audio API error (status {status}): {detail}")]
    Upstream { status: u16, detail: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Audio generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AudioError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AudioError::NotConfigured(_) => "not_configured",
            AudioError::Upstream { .. } => "upstream",
            AudioError::Connection(_) => "connection",
            AudioError::Timeout(_) => "timeout",
            AudioError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Text-to-audio backend. One call per request, never retried.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAudio, AudioError>;
}

/// Generator used when no API key is configured. Always fails with
/// [`AudioError::NotConfigured`].
pub struct UnconfiguredGenerator;

#[async_trait]
impl AudioGenerator for UnconfiguredGenerator {
    fn name(&self) -> &str {
        "none"
    }

    fn is_configured(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedAudio, AudioError> {
        Err(AudioError::NotConfigured(
            "STABILITY_API_KEY is not set".to_string(),
        ))
    }
}
