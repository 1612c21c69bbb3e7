//! LLM refinement of draft prompts.
//!
//! Refinement is best effort: any provider failure falls back to the draft
//! prompt, so callers always get usable text.

use crate::composer::MusicSpecification;
use crate::llm::{CompletionOptions, LlmError, LlmProvider, Message};
use crate::server::metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub const REFINEMENT_SYSTEM_INSTRUCTION: &str = "You are a music prompt editor for a text-to-audio model. \
Using the SPEC and PROMPT_DRAFT below, polish the draft into a natural, fluent prompt suited to music generation. \
Preserve its meaning: duration, tempo, roles, core notes and instruments must stay. \
Remove redundant phrases. \
Emphasize a clean, clear sound that works as a ringtone. \
Return only the final prompt text, with no code blocks and no JSON.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefineOutcome {
    Refined,
    /// The provider failed; the draft is used as is.
    Fallback,
    /// No provider configured.
    Disabled,
}

impl RefineOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RefineOutcome::Refined => "refined",
            RefineOutcome::Fallback => "fallback",
            RefineOutcome::Disabled => "disabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    pub prompt: String,
    pub outcome: RefineOutcome,
}

#[derive(Clone)]
pub struct PromptRefiner {
    provider: Option<Arc<dyn LlmProvider>>,
    options: CompletionOptions,
}

impl PromptRefiner {
    pub fn new(provider: Arc<dyn LlmProvider>, options: CompletionOptions) -> Self {
        Self {
            provider: Some(provider),
            options,
        }
    }

    pub fn disabled() -> Self {
        Self {
            provider: None,
            options: CompletionOptions::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !cfg!(feature = "no_refine") && self.provider.is_some()
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.name())
    }

    pub fn model(&self) -> Option<&str> {
        self.provider.as_deref().map(|p| p.model())
    }

    /// Refines `draft`, falling back to it on any provider error.
    pub async fn refine(&self, spec: &MusicSpecification, draft: &str) -> Refinement {
        let provider = match &self.provider {
            Some(provider) if self.is_enabled() => provider,
            _ => {
                metrics::record_refinement(RefineOutcome::Disabled.as_str());
                return Refinement {
                    prompt: draft.to_string(),
                    outcome: RefineOutcome::Disabled,
                };
            }
        };

        let start = Instant::now();
        let result = self.try_refine(provider.as_ref(), spec, draft).await;
        metrics::record_refinement_duration(provider.name(), start.elapsed());

        let refinement = match result {
            Ok(prompt) => {
                debug!("Refined prompt with {} in {:?}", provider.name(), start.elapsed());
                Refinement {
                    prompt,
                    outcome: RefineOutcome::Refined,
                }
            }
            Err(e) => {
                warn!(
                    "Prompt refinement via {} failed, using draft: {}",
                    provider.name(),
                    e
                );
                Refinement {
                    prompt: draft.to_string(),
                    outcome: RefineOutcome::Fallback,
                }
            }
        };
        metrics::record_refinement(refinement.outcome.as_str());
        refinement
    }

    async fn try_refine(
        &self,
        provider: &dyn LlmProvider,
        spec: &MusicSpecification,
        draft: &str,
    ) -> Result<String, LlmError> {
        let messages = build_messages(spec, draft)?;
        let response = provider.complete(&messages, &self.options).await?;

        let refined = clean_output(&response.message.content).ok_or_else(|| {
            LlmError::InvalidResponse(format!(
                "Empty refinement (finish reason {:?})",
                response.finish_reason
            ))
        })?;

        Ok(ensure_core_notes(refined, &spec.blocks.core_notes))
    }
}

fn build_messages(spec: &MusicSpecification, draft: &str) -> Result<Vec<Message>, LlmError> {
    let spec_json =
        serde_json::to_string_pretty(spec).map_err(|e| LlmError::Serialization(e.to_string()))?;
    Ok(vec![
        Message::system(REFINEMENT_SYSTEM_INSTRUCTION),
        Message::user(format!("SPEC:\n{}\n\nPROMPT_DRAFT:\n{}", spec_json, draft)),
    ])
}

/// Strips markdown code fences (with optional language tag) and trims.
/// Returns `None` when nothing is left.
pub fn clean_output(text: &str) -> Option<String> {
    let mut cleaned = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find("```") {
        cleaned.push_str(&rest[..pos]);
        rest = rest[pos + 3..].trim_start_matches(|c: char| c.is_ascii_lowercase());
    }
    cleaned.push_str(rest);

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Appends the core-notes sentence if the refined text dropped it.
fn ensure_core_notes(refined: String, core_notes_sentence: &str) -> String {
    let sentence = core_notes_sentence.trim();
    if sentence.is_empty() || refined.contains(sentence.trim_end_matches('.')) {
        return refined;
    }
    let separator = if refined.ends_with('.') { " " } else { ". " };
    format!("{}{}{}", refined, separator, sentence)
}
