//! Static sound map: categories anchored to a root note, each holding charms.
//!
//! The knowledge base is built once at startup and never written afterwards,
//! so it is shared behind an `Arc` without locking.

mod load;
mod models;
mod resolve;

pub use load::KnowledgeBaseError;
pub use models::{Category, Charm, RootNote};
pub use resolve::Resolution;

use std::collections::HashMap;
use tracing::warn;

/// Position of a charm inside `categories`.
#[derive(Debug, Clone, Copy)]
struct CharmPosition {
    category: usize,
    charm: usize,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    categories: Vec<Category>,
    index: HashMap<String, CharmPosition>,
}

impl KnowledgeBase {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut index = HashMap::new();
        for (category_idx, category) in categories.iter().enumerate() {
            for (charm_idx, charm) in category.charms.iter().enumerate() {
                if index.contains_key(&charm.charm_name) {
                    // First-declared category keeps the name.
                    warn!(
                        "Duplicate charm {:?} in category {:?} ignored",
                        charm.charm_name, category.category_name
                    );
                    continue;
                }
                index.insert(
                    charm.charm_name.clone(),
                    CharmPosition {
                        category: category_idx,
                        charm: charm_idx,
                    },
                );
            }
        }
        Self { categories, index }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn charm_count(&self) -> usize {
        self.index.len()
    }
}
