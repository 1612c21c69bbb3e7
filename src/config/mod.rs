mod file_config;

pub use file_config::{AudioConfig, ComposerConfig, FileConfig, LlmConfig, UsageConfig};

use crate::audio::{
    AudioGenerator, OutputFormat, StableAudioClient, UnconfiguredGenerator,
    DEFAULT_STABLE_AUDIO_MODEL, DEFAULT_STABLE_AUDIO_URL,
};
use crate::composer::DEFAULT_DURATION_SECONDS;
use crate::llm::{
    CompletionOptions, GeminiProvider, LlmProvider, OpenAIProvider, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL,
};
use crate::refiner::PromptRefiner;
use crate::server::RequestsLoggingLevel;
use crate::usage::UsagePolicy;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_DURATION_SECONDS: u32 = 190;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub knowledge_base: Option<PathBuf>,
    pub llm_api_key: Option<String>,
    pub audio_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    /// `None` uses the sound map bundled with the binary.
    pub knowledge_base_path: Option<PathBuf>,

    // Feature configs (with defaults)
    pub composer: ComposerSettings,
    pub llm: LlmSettings,
    pub audio: AudioSettings,
    pub usage: UsageSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub default_duration_seconds: u32,
    pub max_duration_seconds: u32,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
            max_duration_seconds: DEFAULT_MAX_DURATION_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    Gemini,
    OpenAi,
    /// Refinement disabled.
    None,
}

impl LlmProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LlmProviderKind::Gemini => "gemini",
            LlmProviderKind::OpenAi => "openai",
            LlmProviderKind::None => "none",
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(LlmProviderKind::Gemini),
            "openai" => Ok(LlmProviderKind::OpenAi),
            "none" | "" => Ok(LlmProviderKind::None),
            other => Err(format!("Unknown LLM provider {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: None,
            timeout: self.timeout,
        }
    }

    pub fn build_provider(&self) -> Option<Arc<dyn LlmProvider>> {
        match self.provider {
            LlmProviderKind::None => None,
            LlmProviderKind::Gemini => Some(Arc::new(GeminiProvider::new(
                self.base_url.clone(),
                self.model.clone(),
                self.api_key.clone().unwrap_or_default(),
            ))),
            LlmProviderKind::OpenAi => Some(Arc::new(OpenAIProvider::new(
                self.base_url.clone(),
                self.model.clone(),
                self.api_key.clone(),
            ))),
        }
    }

    pub fn build_refiner(&self) -> PromptRefiner {
        match self.build_provider() {
            Some(provider) => PromptRefiner::new(provider, self.completion_options()),
            None => PromptRefiner::disabled(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub output_format: OutputFormat,
    pub timeout: Duration,
}

impl AudioSettings {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn build_generator(&self) -> Arc<dyn AudioGenerator> {
        match self.api_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => Arc::new(StableAudioClient::new(
                self.api_url.clone(),
                key,
                self.model.clone(),
                self.timeout,
            )),
            None => Arc::new(UnconfiguredGenerator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSettings {
    pub policy: UsagePolicy,
    pub cleanup_interval: Duration,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(s) => match parse_logging_level(&s) {
                Some(level) => level,
                None => bail!("Unknown logging_level {:?}", s),
            },
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let knowledge_base_path = file
            .knowledge_base
            .map(PathBuf::from)
            .or_else(|| cli.knowledge_base.clone());
        if let Some(path) = &knowledge_base_path {
            if !path.is_file() {
                bail!("Knowledge base file does not exist: {:?}", path);
            }
        }

        // Composer settings
        let composer_file = file.composer.unwrap_or_default();
        let composer = ComposerSettings {
            default_duration_seconds: composer_file
                .default_duration_seconds
                .unwrap_or(DEFAULT_DURATION_SECONDS),
            max_duration_seconds: composer_file
                .max_duration_seconds
                .unwrap_or(DEFAULT_MAX_DURATION_SECONDS),
        };
        if composer.default_duration_seconds == 0 || composer.max_duration_seconds == 0 {
            bail!("Composer durations must be positive");
        }
        if composer.default_duration_seconds > composer.max_duration_seconds {
            bail!(
                "default_duration_seconds ({}) exceeds max_duration_seconds ({})",
                composer.default_duration_seconds,
                composer.max_duration_seconds
            );
        }

        let llm = resolve_llm(cli, file.llm.unwrap_or_default())?;
        let audio = resolve_audio(cli, file.audio.unwrap_or_default())?;

        // Usage settings
        let usage_file = file.usage.unwrap_or_default();
        let policy = UsagePolicy {
            enabled: usage_file.enabled.unwrap_or(true),
            max_uses: usage_file.max_uses.unwrap_or(2),
            reset_window: match usage_file.reset_window_hours.unwrap_or(24) {
                0 => None,
                hours => match hours.checked_mul(60 * 60) {
                    Some(secs) => Some(Duration::from_secs(secs)),
                    None => bail!("usage.reset_window_hours ({}) is too large", hours),
                },
            },
        };
        if policy.enabled && policy.max_uses == 0 {
            bail!("usage.max_uses must be positive when usage limiting is enabled");
        }
        let usage = UsageSettings {
            policy,
            cleanup_interval: Duration::from_secs(
                usage_file.cleanup_interval_secs.unwrap_or(600).max(1),
            ),
        };

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            knowledge_base_path,
            composer,
            llm,
            audio,
            usage,
        })
    }
}

fn resolve_llm(cli: &CliConfig, llm_file: LlmConfig) -> Result<LlmSettings> {
    let api_key = llm_file
        .api_key
        .or_else(|| cli.llm_api_key.clone())
        .filter(|k| !k.trim().is_empty());

    let provider = match llm_file.provider {
        Some(s) => match LlmProviderKind::from_str(&s) {
            Ok(kind) => kind,
            Err(e) => bail!(e),
        },
        None if api_key.is_some() => LlmProviderKind::Gemini,
        None => LlmProviderKind::None,
    };
    if provider == LlmProviderKind::Gemini && api_key.is_none() {
        bail!("The gemini LLM provider requires an API key (LLM_API_KEY or [llm] api_key)");
    }

    let (default_base_url, default_model) = match provider {
        LlmProviderKind::OpenAi => (DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL),
        _ => (DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL),
    };

    let temperature = llm_file.temperature.unwrap_or(0.3);
    if !(0.0..=2.0).contains(&temperature) {
        bail!("llm.temperature must be between 0.0 and 2.0, got {}", temperature);
    }

    Ok(LlmSettings {
        provider,
        base_url: llm_file
            .base_url
            .unwrap_or_else(|| default_base_url.to_string()),
        model: llm_file.model.unwrap_or_else(|| default_model.to_string()),
        api_key,
        temperature,
        timeout: Duration::from_secs(llm_file.timeout_secs.unwrap_or(30)),
    })
}

fn resolve_audio(cli: &CliConfig, audio_file: AudioConfig) -> Result<AudioSettings> {
    let output_format = match audio_file.output_format {
        Some(s) => match OutputFormat::from_str(&s) {
            Ok(format) => format,
            Err(e) => bail!(e),
        },
        None => OutputFormat::default(),
    };

    Ok(AudioSettings {
        api_url: audio_file
            .api_url
            .unwrap_or_else(|| DEFAULT_STABLE_AUDIO_URL.to_string()),
        api_key: audio_file
            .api_key
            .or_else(|| cli.audio_api_key.clone())
            .filter(|k| !k.trim().is_empty()),
        model: audio_file
            .model
            .unwrap_or_else(|| DEFAULT_STABLE_AUDIO_MODEL.to_string()),
        output_format,
        timeout: Duration::from_secs(audio_file.timeout_secs.unwrap_or(120)),
    })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
