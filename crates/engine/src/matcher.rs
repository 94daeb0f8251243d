use tally_core::{MatchStatus, Transaction};

use crate::corpus::ReferenceCorpus;
use crate::normalize::{normalize, token_set_ratio};

/// Default fuzzy acceptance threshold. A product decision, not a
/// structural one, so it stays configurable.
pub const DEFAULT_FUZZY_THRESHOLD: f32 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Exact {
        category: String,
        sub_category: String,
    },
    Fuzzy {
        category: String,
        sub_category: String,
        score: f32,
    },
    Unmatched,
}

impl Classification {
    pub fn status(&self) -> MatchStatus {
        match self {
            Classification::Exact { .. } => MatchStatus::Exact,
            Classification::Fuzzy { .. } => MatchStatus::Fuzzy,
            Classification::Unmatched => MatchStatus::Unmatched,
        }
    }

    pub fn score(&self) -> Option<f32> {
        match self {
            Classification::Exact { .. } => Some(100.0),
            Classification::Fuzzy { score, .. } => Some(*score),
            Classification::Unmatched => None,
        }
    }

    /// Writes this classification into a transaction. The stored
    /// `match_score` is populated only for fuzzy hits.
    pub fn apply_to(&self, tx: &mut Transaction) {
        match self {
            Classification::Exact {
                category,
                sub_category,
            } => {
                tx.category = Some(category.clone());
                tx.sub_category = Some(sub_category.clone());
                tx.status = MatchStatus::Exact;
                tx.match_score = None;
            }
            Classification::Fuzzy {
                category,
                sub_category,
                score,
            } => {
                tx.category = Some(category.clone());
                tx.sub_category = Some(sub_category.clone());
                tx.status = MatchStatus::Fuzzy;
                tx.match_score = Some(*score);
            }
            Classification::Unmatched => tx.clear_assignment(),
        }
    }
}

/// Classifies descriptions against the reference corpus: exact pass first,
/// then a fuzzy scan over every pattern. Pure; never mutates the corpus,
/// so re-classification after corpus changes is always safe.
///
/// The fuzzy pass is O(corpus size) per call. Fine while the corpus is
/// bounded by distinct merchant patterns (hundreds); a much larger corpus
/// would need an indexed scan instead.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub fuzzy_threshold: f32,
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

impl Matcher {
    pub fn new(fuzzy_threshold: f32) -> Self {
        Matcher { fuzzy_threshold }
    }

    pub fn classify(&self, description: &str, corpus: &ReferenceCorpus) -> Classification {
        if let Some(entry) = corpus.find_exact(description) {
            return Classification::Exact {
                category: entry.category.clone(),
                sub_category: entry.sub_category.clone(),
            };
        }

        let query = normalize(description);
        let mut best: Option<(f32, u64, &tally_core::ReferenceEntry)> = None;
        for (entry, revision) in corpus.candidates() {
            let score = token_set_ratio(&query, &entry.pattern);
            let better = match best {
                None => true,
                // Equal top scores: the most recently upserted entry wins.
                Some((best_score, best_rev, _)) => {
                    score > best_score || (score == best_score && revision > best_rev)
                }
            };
            if better {
                best = Some((score, revision, entry));
            }
        }

        match best {
            Some((score, _, entry)) if score >= self.fuzzy_threshold => Classification::Fuzzy {
                category: entry.category.clone(),
                sub_category: entry.sub_category.clone(),
                score,
            },
            _ => Classification::Unmatched,
        }
    }
}
