//! Sound map loading.
//!
//! The on-disk format is the sound map JSON shared with the web client:
//! `{"sound_map": [{"category_name", "musical_note", "international_note", "charms": [...]}]}`.

use super::{Category, Charm, KnowledgeBase, RootNote};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const EMBEDDED_SOUND_MAP: &str = include_str!("sound_map.json");

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("Failed to read sound map {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse sound map: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Category {category:?} has no valid root note (international {international:?}, solfege {solfege:?})")]
    InvalidRootNote {
        category: String,
        international: Option<String>,
        solfege: Option<String>,
    },

    #[error("Category at position {0} has an empty name")]
    EmptyCategoryName(usize),
}

#[derive(Debug, Deserialize)]
struct SoundMapFile {
    #[serde(default)]
    sound_map: Vec<SoundMapCategory>,
}

#[derive(Debug, Deserialize)]
struct SoundMapCategory {
    #[serde(default)]
    category_name: String,
    #[serde(default)]
    musical_note: Option<String>,
    #[serde(default)]
    international_note: Option<String>,
    #[serde(default)]
    charms: Vec<SoundMapCharm>,
}

#[derive(Debug, Deserialize)]
struct SoundMapCharm {
    charm_name: String,
    #[serde(default)]
    keywords: Vec<String>,
}

impl SoundMapCategory {
    fn into_category(self, position: usize) -> Result<Category, KnowledgeBaseError> {
        if self.category_name.trim().is_empty() {
            return Err(KnowledgeBaseError::EmptyCategoryName(position));
        }

        // The international letter wins; the solfège name is only a fallback.
        let root_note = self
            .international_note
            .as_deref()
            .and_then(|s| s.parse::<RootNote>().ok())
            .or_else(|| self.musical_note.as_deref().and_then(RootNote::from_solfege));

        let root_note = match root_note {
            Some(note) => note,
            None => {
                return Err(KnowledgeBaseError::InvalidRootNote {
                    category: self.category_name,
                    international: self.international_note,
                    solfege: self.musical_note,
                })
            }
        };

        Ok(Category {
            category_name: self.category_name,
            root_note,
            charms: self
                .charms
                .into_iter()
                .map(|c| Charm {
                    charm_name: c.charm_name,
                    keywords: c.keywords,
                })
                .collect(),
        })
    }
}

impl KnowledgeBase {
    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeBaseError> {
        let file: SoundMapFile = serde_json::from_str(json)?;
        let categories = file
            .sound_map
            .into_iter()
            .enumerate()
            .map(|(position, category)| category.into_category(position))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(KnowledgeBase::new(categories))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeBaseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| KnowledgeBaseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let kb = Self::from_json_str(&content)?;
        info!(
            "Loaded sound map from {:?}: {} categories, {} charms",
            path,
            kb.category_count(),
            kb.charm_count()
        );
        Ok(kb)
    }

    /// The sound map bundled with the binary.
    pub fn embedded() -> Result<Self, KnowledgeBaseError> {
        Self::from_json_str(EMBEDDED_SOUND_MAP)
    }
}
