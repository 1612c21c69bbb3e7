//! Deterministic composition: selected charms in, music specification and
//! prompt text out.

mod builder;
mod models;
mod render;
mod tables;

pub use builder::{build_specification, core_notes_block, DEFAULT_DURATION_SECONDS};
pub use models::{
    ComposeContext, ComposeError, DurationMode, Dynamics, InputTrait, Instrumentation, Melody,
    MusicSpecification, PromptBlocks, RoleTrait, Roles, Tempo, MAX_STAGE, MIN_STAGE,
};
pub use render::{render_generation_prompt, render_prompt};
pub use tables::{DynamicMark, Genre, RhythmBand};

use crate::knowledge_base::KnowledgeBase;
use std::sync::Arc;
use tracing::debug;

/// Composer bound to one knowledge base snapshot.
#[derive(Clone)]
pub struct Composer {
    knowledge_base: Arc<KnowledgeBase>,
    default_duration_seconds: u32,
}

impl Composer {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self {
            knowledge_base,
            default_duration_seconds: DEFAULT_DURATION_SECONDS,
        }
    }

    pub fn with_default_duration(mut self, duration_seconds: u32) -> Self {
        if duration_seconds > 0 {
            self.default_duration_seconds = duration_seconds;
        }
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    pub fn default_duration_seconds(&self) -> u32 {
        self.default_duration_seconds
    }

    pub fn compose(
        &self,
        traits: &[InputTrait],
        context: ComposeContext,
    ) -> Result<MusicSpecification, ComposeError> {
        let context = ComposeContext {
            duration_seconds: Some(
                context
                    .duration_seconds
                    .filter(|d| *d > 0)
                    .unwrap_or(self.default_duration_seconds),
            ),
        };
        let spec = build_specification(&self.knowledge_base, traits, context)?;
        debug!(
            "Composed {} traits: lead={:?} core_notes={} tempo={} {} mode={}",
            traits.len(),
            spec.instruments.lead,
            spec.melody.notes_text,
            spec.tempo.label,
            spec.tempo.bpm,
            spec.mode.as_str()
        );
        Ok(spec)
    }

    pub fn render(&self, spec: &MusicSpecification) -> String {
        render_prompt(spec)
    }
}
