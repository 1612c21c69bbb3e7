use crate::knowledge_base::RootNote;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::tables::{DynamicMark, Genre};

/// Lowest and highest intensity stage.
pub const MIN_STAGE: u8 = 1;
pub const MAX_STAGE: u8 = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    #[error("At least one charm must be selected")]
    EmptyInput,
}

/// A charm selected by the user, with its intensity stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputTrait {
    #[serde(alias = "name")]
    pub charm_name: String,
    /// Raw stage as supplied. Accepts integers, floats and numeric strings.
    #[serde(default, deserialize_with = "deserialize_lenient_stage")]
    pub stage: Option<i64>,
}

impl InputTrait {
    pub fn new(charm_name: impl Into<String>, stage: i64) -> Self {
        Self {
            charm_name: charm_name.into(),
            stage: Some(stage),
        }
    }

    /// Stage used by the composer: missing or out-of-range stages count as 1.
    pub fn effective_stage(&self) -> u8 {
        match self.stage {
            Some(s) if (MIN_STAGE as i64..=MAX_STAGE as i64).contains(&s) => s as u8,
            _ => MIN_STAGE,
        }
    }

    /// Clamps the stage into the valid range, as done at the request edge.
    pub fn clamped(mut self) -> Self {
        self.stage = self
            .stage
            .map(|s| s.clamp(MIN_STAGE as i64, MAX_STAGE as i64));
        self
    }
}

fn deserialize_lenient_stage<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.round() as i64)
            })
        }
        _ => None,
    }))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeContext {
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

impl ComposeContext {
    pub fn with_duration(duration_seconds: u32) -> Self {
        Self {
            duration_seconds: Some(duration_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    /// Clips of 30 seconds or less.
    Short,
    Standard,
}

impl DurationMode {
    pub const SHORT_MODE_MAX_SECONDS: u32 = 30;

    pub fn for_duration(duration_seconds: u32) -> Self {
        if duration_seconds <= Self::SHORT_MODE_MAX_SECONDS {
            DurationMode::Short
        } else {
            DurationMode::Standard
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurationMode::Short => "short",
            DurationMode::Standard => "standard",
        }
    }
}

/// A trait as placed in a role bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleTrait {
    pub charm_name: String,
    pub stage: u8,
    pub category: Option<String>,
    pub root_note: Option<RootNote>,
    pub instrument: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Roles {
    pub lead: Vec<RoleTrait>,
    pub support: Vec<RoleTrait>,
    pub fx: Vec<RoleTrait>,
    pub ambience: Vec<RoleTrait>,
}

impl Roles {
    pub fn len(&self) -> usize {
        self.lead.len() + self.support.len() + self.fx.len() + self.ambience.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Melody {
    pub core_notes: Vec<RootNote>,
    pub notes_text: String,
    /// Keyword form of the rhythm band.
    pub rhythm_text: String,
    /// Note-value form of the rhythm band.
    pub rhythm_detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrumentation {
    pub lead: String,
    pub support: Vec<String>,
    pub fx: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tempo {
    pub label: String,
    pub bpm: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dynamics {
    pub low: DynamicMark,
    pub high: DynamicMark,
}

/// Pre-rendered descriptive sentences, one per prompt block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptBlocks {
    pub identity: String,
    pub core_notes: String,
    pub form: String,
    pub instrumentation: String,
    pub harmony: String,
    pub rhythm_tempo: String,
    pub dynamics: String,
    pub mix: String,
    pub constraints: String,
}

/// The structured result of one composition request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicSpecification {
    pub duration_seconds: u32,
    pub mode: DurationMode,
    pub roles: Roles,
    pub melody: Melody,
    pub instruments: Instrumentation,
    pub genres: Vec<Genre>,
    pub tempo: Tempo,
    pub key: String,
    pub time_signature: String,
    pub dynamics: Dynamics,
    pub keywords: Vec<String>,
    pub avoid: Vec<String>,
    pub blocks: PromptBlocks,
}
