use std::collections::HashMap;

use tally_core::ReferenceEntry;

use crate::normalize::normalize;

/// In-memory view of the learned pattern corpus.
///
/// Entries keep insertion order (the on-disk order) and carry a revision
/// stamp refreshed on every upsert; the matcher uses revision recency to
/// break fuzzy-score ties in favour of the user's latest intent.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    entries: Vec<Stamped>,
    index: HashMap<String, usize>,
    next_revision: u64,
}

#[derive(Debug, Clone)]
struct Stamped {
    entry: ReferenceEntry,
    revision: u64,
}

/// What an upsert did, with enough state to undo it if the durable write
/// that must follow fails.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    index: usize,
    replaced: Option<Stamped>,
}

impl UpsertOutcome {
    pub fn inserted(&self) -> bool {
        self.replaced.is_none()
    }
}

impl ReferenceCorpus {
    pub fn new() -> Self {
        ReferenceCorpus::default()
    }

    /// Builds the corpus from persisted entries, normalizing each pattern.
    /// Duplicate normalized patterns collapse, last one wins.
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let mut corpus = ReferenceCorpus::new();
        for entry in entries {
            corpus.upsert(&entry.pattern, &entry.category, &entry.sub_category);
        }
        corpus
    }

    /// Inserts or replaces the entry whose normalized pattern equals the
    /// normalized input. Last write wins; either way the entry gets a fresh
    /// revision stamp.
    pub fn upsert(&mut self, pattern: &str, category: &str, sub_category: &str) -> UpsertOutcome {
        let key = normalize(pattern);
        let entry = ReferenceEntry::new(key.clone(), category, sub_category);
        let revision = self.next_revision;
        self.next_revision += 1;

        match self.index.get(&key).copied() {
            Some(index) => {
                let replaced = self.entries[index].clone();
                self.entries[index] = Stamped { entry, revision };
                UpsertOutcome {
                    index,
                    replaced: Some(replaced),
                }
            }
            None => {
                let index = self.entries.len();
                self.entries.push(Stamped { entry, revision });
                self.index.insert(key, index);
                UpsertOutcome {
                    index,
                    replaced: None,
                }
            }
        }
    }

    /// Undoes the matching `upsert`. Only valid immediately after the
    /// upsert it came from, which is the rollback window the session needs.
    pub fn revert(&mut self, outcome: UpsertOutcome) {
        match outcome.replaced {
            Some(previous) => self.entries[outcome.index] = previous,
            None => {
                if let Some(stamped) = self.entries.pop() {
                    self.index.remove(&stamped.entry.pattern);
                }
            }
        }
    }

    pub fn find_exact(&self, description: &str) -> Option<&ReferenceEntry> {
        self.index
            .get(&normalize(description))
            .map(|&i| &self.entries[i].entry)
    }

    /// All entries with their revision stamps, for the fuzzy scan.
    pub fn candidates(&self) -> impl Iterator<Item = (&ReferenceEntry, u64)> {
        self.entries.iter().map(|s| (&s.entry, s.revision))
    }

    /// Entries in insertion order — the persistent view.
    pub fn entries(&self) -> Vec<ReferenceEntry> {
        self.entries.iter().map(|s| s.entry.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
