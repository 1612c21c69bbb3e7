//! Charm Ringtone Server Library
//!
//! Turns selected personality charms into a music specification and prompt,
//! and serves the composition and audio generation API.

pub mod audio;
pub mod composer;
pub mod config;
pub mod knowledge_base;
pub mod llm;
pub mod refiner;
pub mod server;
pub mod usage;

// Re-export commonly used types for convenience
pub use composer::{Composer, InputTrait, MusicSpecification};
pub use knowledge_base::KnowledgeBase;
pub use server::{run_server, RequestsLoggingLevel};
pub use usage::{UsageLimiter, UsagePolicy};
