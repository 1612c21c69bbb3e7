use super::{Category, Charm, KnowledgeBase, RootNote};

/// Result of looking a charm name up in the knowledge base.
///
/// Unknown names resolve to the empty resolution rather than an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub category: Option<&'a str>,
    pub root_note: Option<RootNote>,
    pub keywords: &'a [String],
}

impl Resolution<'static> {
    pub const EMPTY: Self = Resolution {
        category: None,
        root_note: None,
        keywords: &[],
    };
}

impl<'a> Resolution<'a> {
    fn found(category: &'a Category, charm: &'a Charm) -> Self {
        Self {
            category: Some(category.category_name.as_str()),
            root_note: Some(category.root_note),
            keywords: &charm.keywords,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.category.is_some()
    }

    pub fn instrument(&self) -> Option<&'a str> {
        self.keywords.first().map(String::as_str)
    }

    pub fn moods(&self) -> &'a [String] {
        self.keywords.get(1..).unwrap_or(&[])
    }
}

impl KnowledgeBase {
    /// Exact, case-sensitive lookup of a charm by name.
    pub fn resolve(&self, charm_name: &str) -> Resolution<'_> {
        match self.index.get(charm_name) {
            Some(position) => {
                let category = &self.categories[position.category];
                Resolution::found(category, &category.charms[position.charm])
            }
            None => Resolution::EMPTY,
        }
    }

    /// Linear scan equivalent of [`KnowledgeBase::resolve`].
    pub fn resolve_by_scan(&self, charm_name: &str) -> Resolution<'_> {
        self.categories
            .iter()
            .find_map(|category| {
                category
                    .charms
                    .iter()
                    .find(|charm| charm.charm_name == charm_name)
                    .map(|charm| Resolution::found(category, charm))
            })
            .unwrap_or(Resolution::EMPTY)
    }
}
