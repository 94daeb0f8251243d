use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub category: String,
    #[serde(rename = "subcategories")]
    pub sub_categories: Vec<String>,
}

/// The category → sub-category tree governing valid classifications.
///
/// Grows monotonically: entries are added during review, never removed, so
/// historical corpus references stay valid. Order is insertion order, which
/// is also the on-disk order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    categories: Vec<TaxonomyNode>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Taxonomy::default()
    }

    /// Adds a category. A no-op if it already exists; repeated "add new"
    /// submissions for the same name must not produce duplicates.
    pub fn add_category(&mut self, name: &str) {
        if self.find(name).is_none() {
            self.categories.push(TaxonomyNode {
                category: name.to_string(),
                sub_categories: Vec::new(),
            });
        }
    }

    /// Adds a sub-category under an existing category. Idempotent for
    /// duplicate sub-category names.
    pub fn add_sub_category(&mut self, category: &str, name: &str) -> Result<(), TaxonomyError> {
        let node = self
            .find_mut(category)
            .ok_or_else(|| TaxonomyError::UnknownCategory(category.to_string()))?;
        if !node.sub_categories.iter().any(|s| s == name) {
            node.sub_categories.push(name.to_string());
        }
        Ok(())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|n| n.category.as_str())
    }

    pub fn sub_categories(&self, category: &str) -> impl Iterator<Item = &str> {
        self.find(category)
            .map(|n| n.sub_categories.as_slice())
            .unwrap_or_default()
            .iter()
            .map(String::as_str)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.find(category).is_some()
    }

    pub fn contains(&self, category: &str, sub_category: &str) -> bool {
        self.find(category)
            .is_some_and(|n| n.sub_categories.iter().any(|s| s == sub_category))
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    fn find(&self, category: &str) -> Option<&TaxonomyNode> {
        self.categories.iter().find(|n| n.category == category)
    }

    fn find_mut(&mut self, category: &str) -> Option<&mut TaxonomyNode> {
        self.categories.iter_mut().find(|n| n.category == category)
    }
}
