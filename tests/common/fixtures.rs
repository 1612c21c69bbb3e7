//! Fake collaborators for end-to-end tests
//!
//! The server talks to an LLM and a text-to-audio API. Tests replace both
//! with in-process fakes that record what they were asked.

use super::constants::*;
use async_trait::async_trait;
use charm_ringtone_server::audio::{AudioError, AudioGenerator, GeneratedAudio, GenerationRequest};
use charm_ringtone_server::llm::{
    CompletionOptions, CompletionResponse, FinishReason, LlmError, LlmProvider, Message,
};
use std::sync::{Arc, Mutex};

/// How the fake LLM answers.
#[derive(Clone, Debug)]
pub enum LlmBehavior {
    /// Replies with `FAKE_REFINED_PROMPT` inside a code fence.
    Refine,
    /// Fails every call with an API error.
    Fail,
    /// No provider configured at all.
    Disabled,
}

/// How the fake audio generator answers.
#[derive(Clone, Debug)]
pub enum AudioBehavior {
    /// Returns `FAKE_AUDIO_BYTES`.
    Succeed,
    /// Fails with the given upstream status and body.
    Upstream(u16, String),
    /// Behaves like a server without an API key.
    Unconfigured,
}

pub struct FakeLlmProvider {
    behavior: LlmBehavior,
    pub calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl FakeLlmProvider {
    pub fn new(behavior: LlmBehavior, calls: Arc<Mutex<Vec<Vec<Message>>>>) -> Self {
        Self { behavior, calls }
    }
}

#[async_trait]
impl LlmProvider for FakeLlmProvider {
    fn name(&self) -> &str {
        "fake-llm"
    }

    fn model(&self) -> &str {
        "fake-model-1"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        match self.behavior {
            LlmBehavior::Refine => Ok(CompletionResponse {
                message: Message::assistant(format!("```text\n{}\n```", FAKE_REFINED_PROMPT)),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
            _ => Err(LlmError::Api {
                status: 503,
                message: "model overloaded".to_string(),
            }),
        }
    }
}

pub struct FakeAudioGenerator {
    behavior: AudioBehavior,
    pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl FakeAudioGenerator {
    pub fn new(behavior: AudioBehavior, requests: Arc<Mutex<Vec<GenerationRequest>>>) -> Self {
        Self { behavior, requests }
    }
}

#[async_trait]
impl AudioGenerator for FakeAudioGenerator {
    fn name(&self) -> &str {
        "fake-audio"
    }

    fn is_configured(&self) -> bool {
        !matches!(self.behavior, AudioBehavior::Unconfigured)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedAudio, AudioError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            AudioBehavior::Succeed => Ok(GeneratedAudio {
                bytes: FAKE_AUDIO_BYTES.to_vec(),
                mime: FAKE_AUDIO_MIME.to_string(),
            }),
            AudioBehavior::Upstream(status, detail) => Err(AudioError::Upstream {
                status: *status,
                detail: detail.clone(),
            }),
            AudioBehavior::Unconfigured => Err(AudioError::NotConfigured(
                "no API key in tests".to_string(),
            )),
        }
    }
}
