use std::path::{Path, PathBuf};

use tally_core::ReferenceEntry;

use crate::StoreError;

/// File-backed reference corpus: a CSV table with a
/// `description,category,subcategory` header, rewritten in full on every
/// upsert so disk always equals the in-memory state.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    path: PathBuf,
}

impl CorpusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CorpusStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all entries. A missing file is a first run, not an error.
    pub fn load(&self) -> Result<Vec<ReferenceEntry>, StoreError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "no corpus file yet, starting empty");
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| StoreError::Csv {
            path: self.path.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for result in reader.deserialize::<ReferenceEntry>() {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "skipping bad corpus row");
                }
            }
        }
        Ok(entries)
    }

    /// Full rewrite via temp file + rename.
    pub fn save(&self, entries: &[ReferenceEntry]) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in entries {
            writer.serialize(entry).map_err(|e| StoreError::Csv {
                path: self.path.clone(),
                source: e,
            })?;
        }
        let buf = writer.into_inner().map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e.into_error(),
        })?;
        crate::replace_file(&self.path, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pattern: &str, cat: &str, sub: &str) -> ReferenceEntry {
        ReferenceEntry::new(pattern, cat, sub)
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("references.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("references.csv"));
        let entries = vec![
            entry("grocery store purchase", "Food", "Groceries"),
            entry("starbucks 4421", "Food", "Coffee"),
        ];
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn file_uses_the_expected_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("references.csv");
        let store = CorpusStore::new(&path);
        store
            .save(&[entry("grocery store", "Food", "Groceries")])
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("description,category,subcategory\n"));
    }

    #[test]
    fn bad_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("references.csv");
        std::fs::write(
            &path,
            "description,category,subcategory\ngrocery store,Food,Groceries\nlonely-row\n",
        )
        .unwrap();
        let entries = CorpusStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pattern, "grocery store");
    }

    #[test]
    fn save_to_unwritable_path_errors() {
        // Parent "directory" is a regular file, so the write cannot land.
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let store = CorpusStore::new(blocker.join("refs.csv"));
        assert!(store.save(&[entry("a", "b", "c")]).is_err());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = CorpusStore::new(dir.path().join("references.csv"));
        store.save(&[entry("old pattern", "A", "B")]).unwrap();
        store.save(&[entry("new pattern", "C", "D")]).unwrap();
        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pattern, "new pattern");
    }
}
