use std::path::{Path, PathBuf};

use tally_core::Taxonomy;

use crate::StoreError;

/// File-backed taxonomy: a JSON document of
/// `{"categories": [{"category": ..., "subcategories": [...]}]}`,
/// rewritten in full whenever the taxonomy grows.
#[derive(Debug, Clone)]
pub struct TaxonomyStore {
    path: PathBuf,
}

impl TaxonomyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TaxonomyStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Taxonomy, StoreError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no taxonomy file yet, starting empty");
            return Ok(Taxonomy::new());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| StoreError::Json {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn save(&self, taxonomy: &Taxonomy) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(taxonomy).map_err(|e| StoreError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        crate::replace_file(&self.path, text.as_bytes())
    }
}
