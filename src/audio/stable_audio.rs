//! Stability AI text-to-audio client.

use super::{AudioError, AudioGenerator, GeneratedAudio, GenerationRequest};
use async_trait::async_trait;
use reqwest::multipart::Form;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

pub const DEFAULT_STABLE_AUDIO_URL: &str =
    "https://api.stability.ai/v2beta/audio/stable-audio-2/text-to-audio";
pub const DEFAULT_STABLE_AUDIO_MODEL: &str = "stable-audio-2.5";

/// Upstream error bodies are forwarded, but capped.
const MAX_ERROR_DETAIL_CHARS: usize = 2000;

pub struct StableAudioClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl StableAudioClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }

    fn form(&self, request: &GenerationRequest) -> Form {
        Form::new()
            .text("prompt", request.prompt.clone())
            .text("duration", request.duration_seconds.to_string())
            .text("output_format", request.output_format.as_str())
            .text("model", self.model.clone())
    }
}

#[async_trait]
impl AudioGenerator for StableAudioClient {
    fn name(&self) -> &str {
        "stable-audio"
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAudio, AudioError> {
        if !self.is_configured() {
            return Err(AudioError::NotConfigured(
                "Stability API key is empty".to_string(),
            ));
        }

        debug!(
            model = %self.model,
            duration = request.duration_seconds,
            format = %request.output_format,
            prompt_len = request.prompt.len(),
            "Sending text-to-audio request"
        );

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "audio/*")
            .multipart(self.form(request))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AudioError::Timeout(self.timeout)
                } else {
                    AudioError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = capped_detail(response.text().await.unwrap_or_default());
            error!("Text-to-audio API returned {}: {}", status, detail);
            return Err(AudioError::Upstream {
                status: status.as_u16(),
                detail,
            });
        }

        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| request.output_format.default_mime().to_string());

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AudioError::Timeout(self.timeout)
            } else {
                AudioError::InvalidResponse(format!("Failed to read audio body: {}", e))
            }
        })?;
        if bytes.is_empty() {
            return Err(AudioError::InvalidResponse("Empty audio body".to_string()));
        }

        debug!("Received {} bytes of {}", bytes.len(), mime);
        Ok(GeneratedAudio {
            bytes: bytes.to_vec(),
            mime,
        })
    }
}

/// Upstream bodies are forwarded as-is up to `MAX_ERROR_DETAIL_CHARS`.
fn capped_detail(detail: String) -> String {
    if detail.chars().count() > MAX_ERROR_DETAIL_CHARS {
        detail.chars().take(MAX_ERROR_DETAIL_CHARS).collect()
    } else {
        detail
    }
}
