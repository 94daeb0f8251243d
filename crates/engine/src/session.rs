use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;

use tally_core::{MatchStatus, Money, Taxonomy, Transaction, TransactionId};
use tally_import::{parse_with_layout, LayoutRegistry, ParseError, RowError};
use tally_store::{CorpusStore, StoreError, TaxonomyStore};

use crate::corpus::ReferenceCorpus;
use crate::matcher::Matcher;
use crate::normalize::normalize;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TransactionId),
    #[error("'{category} / {sub_category}' is not in the taxonomy")]
    InvalidCategory {
        category: String,
        sub_category: String,
    },
    #[error("Failed to persist corpus: {0}")]
    CorpusWrite(#[source] StoreError),
    #[error("Failed to persist taxonomy: {0}")]
    TaxonomyWrite(#[source] StoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why one file of an ingest batch was abandoned. Other files continue.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no registered layout matches this file")]
    UnrecognizedLayout,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// One statement file queued for ingest. Without an explicit source the
/// layout is detected from the file's header row.
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub path: PathBuf,
    pub source_id: Option<String>,
}

impl StatementFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StatementFile {
            path: path.into(),
            source_id: None,
        }
    }

    pub fn with_source(path: impl Into<PathBuf>, source_id: impl Into<String>) -> Self {
        StatementFile {
            path: path.into(),
            source_id: Some(source_id.into()),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug)]
pub struct FileFailure {
    pub file: String,
    pub error: FileError,
}

#[derive(Debug, Default)]
pub struct IngestSummary {
    pub ingested: usize,
    pub auto_matched: usize,
    pub unmatched: usize,
    pub row_errors: Vec<(String, RowError)>,
    pub dropped_empty_descriptions: usize,
    pub failed_files: Vec<FileFailure>,
}

/// The user's choice for one side of a category pair: an existing taxonomy
/// name or a brand-new one to be added first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    Existing(String),
    New(String),
}

impl CategoryChoice {
    fn name(&self) -> &str {
        match self {
            CategoryChoice::Existing(name) | CategoryChoice::New(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryTotal {
    pub amount: Money,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub manual: usize,
    pub unmatched: usize,
}

/// One interactive categorization run: parses statement batches, matches
/// them against the corpus, takes corrections, and is the sole writer of
/// the corpus and taxonomy files.
pub struct CategorizationSession {
    registry: LayoutRegistry,
    matcher: Matcher,
    corpus: ReferenceCorpus,
    taxonomy: Taxonomy,
    corpus_store: CorpusStore,
    taxonomy_store: TaxonomyStore,
    order: Vec<TransactionId>,
    transactions: HashMap<TransactionId, Transaction>,
}

impl CategorizationSession {
    /// Loads corpus and taxonomy from their stores. Missing files mean a
    /// first run and start empty.
    pub fn new(
        registry: LayoutRegistry,
        matcher: Matcher,
        corpus_store: CorpusStore,
        taxonomy_store: TaxonomyStore,
    ) -> Result<Self, SessionError> {
        let corpus = ReferenceCorpus::from_entries(corpus_store.load()?);
        let taxonomy = taxonomy_store.load()?;
        Ok(CategorizationSession {
            registry,
            matcher,
            corpus,
            taxonomy,
            corpus_store,
            taxonomy_store,
            order: Vec::new(),
            transactions: HashMap::new(),
        })
    }

    /// Parses and classifies a batch of statement files. File-level
    /// failures are recorded in the summary; they never abort the batch.
    pub fn ingest(&mut self, files: &[StatementFile]) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for file in files {
            let name = file.file_name();
            let report = match self.parse_file(file) {
                Ok(report) => report,
                Err(error) => {
                    tracing::warn!(file = name, error = %error, "skipping file");
                    summary.failed_files.push(FileFailure { file: name, error });
                    continue;
                }
            };

            summary.dropped_empty_descriptions += report.dropped_empty_descriptions;
            for row_error in report.skipped {
                summary.row_errors.push((name.clone(), row_error));
            }

            for mut tx in report.transactions {
                // Manual corrections are terminal: a re-ingested row never
                // claws back a transaction the user already corrected.
                if self
                    .transactions
                    .get(&tx.id)
                    .is_some_and(|prior| prior.status == MatchStatus::Manual)
                {
                    summary.ingested += 1;
                    summary.auto_matched += 1;
                    continue;
                }
                self.matcher
                    .classify(&tx.description, &self.corpus)
                    .apply_to(&mut tx);
                if tx.is_categorized() {
                    summary.auto_matched += 1;
                } else {
                    summary.unmatched += 1;
                }
                summary.ingested += 1;
                if !self.transactions.contains_key(&tx.id) {
                    self.order.push(tx.id.clone());
                }
                self.transactions.insert(tx.id.clone(), tx);
            }
        }

        summary
    }

    fn parse_file(&self, file: &StatementFile) -> Result<tally_import::ParseReport, FileError> {
        let text = std::fs::read_to_string(&file.path)?;
        let layout = match &file.source_id {
            Some(id) => self
                .registry
                .get(id)
                .ok_or_else(|| ParseError::UnknownSource(id.clone()))?,
            None => self
                .registry
                .detect(&text)
                .ok_or(FileError::UnrecognizedLayout)?,
        };
        Ok(parse_with_layout(&text, &file.file_name(), layout)?)
    }

    /// Applies a user correction: validates (or extends) the taxonomy,
    /// durably records the learned pattern, then marks the transaction
    /// `Manual`. All-or-nothing: a failed corpus write rolls back the
    /// in-memory upsert and any taxonomy extension, and leaves the
    /// transaction untouched.
    pub fn apply_correction(
        &mut self,
        id: &TransactionId,
        category: CategoryChoice,
        sub_category: CategoryChoice,
    ) -> Result<(), SessionError> {
        if !self.transactions.contains_key(id) {
            return Err(SessionError::UnknownTransaction(id.clone()));
        }

        let invalid = || SessionError::InvalidCategory {
            category: category.name().to_string(),
            sub_category: sub_category.name().to_string(),
        };

        // Work out the post-correction taxonomy before mutating anything.
        let mut updated = self.taxonomy.clone();
        match &category {
            CategoryChoice::New(name) => updated.add_category(name),
            CategoryChoice::Existing(name) => {
                if !updated.contains_category(name) {
                    return Err(invalid());
                }
            }
        }
        match &sub_category {
            CategoryChoice::New(name) => updated
                .add_sub_category(category.name(), name)
                .map_err(|_| invalid())?,
            CategoryChoice::Existing(name) => {
                if !updated.contains(category.name(), name) {
                    return Err(invalid());
                }
            }
        }

        let taxonomy_changed = updated != self.taxonomy;
        if taxonomy_changed {
            self.taxonomy_store
                .save(&updated)
                .map_err(SessionError::TaxonomyWrite)?;
        }

        // Learn the pattern, durably, before touching the transaction. On a
        // failed corpus write the taxonomy file is restored too, so the
        // whole correction either lands or leaves no trace.
        let description = self.transactions[id].description.clone();
        let outcome = self.corpus.upsert(
            &normalize(&description),
            category.name(),
            sub_category.name(),
        );
        if let Err(e) = self.corpus_store.save(&self.corpus.entries()) {
            self.corpus.revert(outcome);
            if taxonomy_changed {
                if let Err(rollback) = self.taxonomy_store.save(&self.taxonomy) {
                    tracing::warn!(error = %rollback, "taxonomy file rollback failed");
                }
            }
            return Err(SessionError::CorpusWrite(e));
        }
        self.taxonomy = updated;

        let tx = self
            .transactions
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownTransaction(id.clone()))?;
        tx.category = Some(category.name().to_string());
        tx.sub_category = Some(sub_category.name().to_string());
        tx.status = MatchStatus::Manual;
        tx.match_score = None;
        Ok(())
    }

    /// Re-runs the matcher over still-unmatched transactions against the
    /// latest corpus. `Manual` and earlier auto-matches are left alone.
    /// Returns how many transactions resolved.
    pub fn refresh(&mut self) -> usize {
        let mut resolved = 0;
        for id in &self.order {
            let Some(tx) = self.transactions.get(id) else {
                continue;
            };
            if tx.status != MatchStatus::Unmatched {
                continue;
            }
            let classification = self.matcher.classify(&tx.description, &self.corpus);
            if classification.status() != MatchStatus::Unmatched {
                if let Some(tx) = self.transactions.get_mut(id) {
                    classification.apply_to(tx);
                    resolved += 1;
                }
            }
        }
        resolved
    }

    // ── read-only projections ─────────────────────────────────────────────────

    pub fn working_set(&self) -> impl Iterator<Item = &Transaction> {
        self.order.iter().filter_map(|id| self.transactions.get(id))
    }

    pub fn pending_review(&self) -> impl Iterator<Item = &Transaction> {
        self.working_set()
            .filter(|tx| tx.status == MatchStatus::Unmatched)
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    pub fn category_totals(&self) -> BTreeMap<(String, String), CategoryTotal> {
        let mut totals: BTreeMap<(String, String), CategoryTotal> = BTreeMap::new();
        for tx in self.working_set() {
            let (Some(cat), Some(sub)) = (&tx.category, &tx.sub_category) else {
                continue;
            };
            let slot = totals
                .entry((cat.clone(), sub.clone()))
                .or_insert(CategoryTotal {
                    amount: Money::zero(),
                    count: 0,
                });
            slot.amount += tx.amount;
            slot.count += 1;
        }
        totals
    }

    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for tx in self.working_set() {
            counts.total += 1;
            match tx.status {
                MatchStatus::Exact => counts.exact += 1,
                MatchStatus::Fuzzy => counts.fuzzy += 1,
                MatchStatus::Manual => counts.manual += 1,
                MatchStatus::Unmatched => counts.unmatched += 1,
            }
        }
        counts
    }

    /// Categorized / total, in [0, 1]. An empty working set is complete.
    pub fn completion(&self) -> f32 {
        let counts = self.status_counts();
        if counts.total == 0 {
            return 1.0;
        }
        (counts.total - counts.unmatched) as f32 / counts.total as f32
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn corpus(&self) -> &ReferenceCorpus {
        &self.corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const REGISTRY: &str = "\
chase,Transaction Date,Description,Amount
pnc,Date,Description,Withdrawals,Deposits,Balance
";

    struct Fixture {
        dir: tempfile::TempDir,
        session: CategorizationSession,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = LayoutRegistry::from_reader(REGISTRY.as_bytes()).unwrap();
        let session = CategorizationSession::new(
            registry,
            Matcher::default(),
            CorpusStore::new(dir.path().join("references.csv")),
            TaxonomyStore::new(dir.path().join("categories.json")),
        )
        .unwrap();
        Fixture { dir, session }
    }

    fn write_statement(dir: &Path, name: &str, body: &str) -> StatementFile {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        StatementFile::new(path)
    }

    fn first_pending_id(session: &CategorizationSession) -> TransactionId {
        session.pending_review().next().unwrap().id.clone()
    }

    #[test]
    fn ingest_empty_corpus_leaves_everything_pending() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,GROCERY STORE PURCHASE,45.67\n",
        );
        let summary = fx.session.ingest(&[file]);
        assert_eq!(summary.ingested, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.auto_matched, 0);

        let pending: Vec<_> = fx.session.pending_review().collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, MatchStatus::Unmatched);
    }

    #[test]
    fn ingest_detects_the_source_layout() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "bank.csv",
            "Date,Description,Withdrawals,Deposits,Balance\n01/15/2025,GROCERY,45.67,,\n",
        );
        fx.session.ingest(&[file]);
        let tx = fx.session.working_set().next().unwrap();
        assert_eq!(tx.source_id, "pnc");
    }

    #[test]
    fn bad_file_does_not_abort_the_batch() {
        let mut fx = fixture();
        let good = write_statement(
            fx.dir.path(),
            "good.csv",
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        );
        let bad = write_statement(fx.dir.path(), "bad.csv", "Posted,Merchant,Total\n");
        let missing = StatementFile::new(fx.dir.path().join("nope.csv"));

        let summary = fx.session.ingest(&[bad, missing, good]);
        assert_eq!(summary.ingested, 1);
        assert_eq!(summary.failed_files.len(), 2);
        assert!(matches!(
            summary.failed_files[0].error,
            FileError::UnrecognizedLayout
        ));
        assert!(matches!(summary.failed_files[1].error, FileError::Io(_)));
    }

    #[test]
    fn forced_source_skips_detection() {
        let mut fx = fixture();
        let path = fx.dir.path().join("jan.csv");
        std::fs::write(
            &path,
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        )
        .unwrap();
        let summary = fx
            .session
            .ingest(&[StatementFile::with_source(&path, "chase")]);
        assert_eq!(summary.ingested, 1);

        let summary = fx
            .session
            .ingest(&[StatementFile::with_source(&path, "monzo")]);
        assert!(matches!(
            summary.failed_files[0].error,
            FileError::Parse(ParseError::UnknownSource(_))
        ));
    }

    #[test]
    fn correction_flow_end_to_end() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,GROCERY STORE PURCHASE,45.67\n",
        );
        fx.session.ingest(&[file]);
        let id = first_pending_id(&fx.session);

        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap();

        let tx = fx.session.get(&id).unwrap();
        assert_eq!(tx.status, MatchStatus::Manual);
        assert_eq!(tx.category.as_deref(), Some("Food"));
        assert_eq!(tx.sub_category.as_deref(), Some("Groceries"));
        assert_eq!(tx.match_score, None);
        assert_eq!(fx.session.pending_review().count(), 0);

        // The learned pattern is on disk, normalized.
        let entries = CorpusStore::new(fx.dir.path().join("references.csv"))
            .load()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pattern, "grocery store purchase");

        // So is the extended taxonomy.
        let tax = TaxonomyStore::new(fx.dir.path().join("categories.json"))
            .load()
            .unwrap();
        assert!(tax.contains("Food", "Groceries"));
    }

    #[test]
    fn correction_with_unknown_id_fails() {
        let mut fx = fixture();
        let err = fx
            .session
            .apply_correction(
                &TransactionId::derive("x.csv", "chase", 0),
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownTransaction(_)));
    }

    #[test]
    fn correction_with_unknown_existing_pair_fails_cleanly() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        );
        fx.session.ingest(&[file]);
        let id = first_pending_id(&fx.session);

        let err = fx
            .session
            .apply_correction(
                &id,
                CategoryChoice::Existing("Food".into()),
                CategoryChoice::Existing("Coffee".into()),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCategory { .. }));

        // No partial mutation anywhere.
        assert_eq!(fx.session.get(&id).unwrap().status, MatchStatus::Unmatched);
        assert!(fx.session.corpus().is_empty());
        assert!(fx.session.taxonomy().is_empty());
    }

    #[test]
    fn new_sub_under_existing_category_is_accepted() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        );
        fx.session.ingest(&[file]);
        let id = first_pending_id(&fx.session);

        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Coffee".into()),
            )
            .unwrap();

        // Same category as Existing, a different new sub.
        let file2 = write_statement(
            fx.dir.path(),
            "feb.csv",
            "Transaction Date,Description,Amount\n2025-02-15,BAKERY,8.00\n",
        );
        fx.session.ingest(&[file2]);
        let id2 = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id2,
                CategoryChoice::Existing("Food".into()),
                CategoryChoice::New("Bakery".into()),
            )
            .unwrap();

        assert!(fx.session.taxonomy().contains("Food", "Bakery"));
    }

    #[test]
    fn failed_corpus_write_rolls_back_memory() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LayoutRegistry::from_reader(REGISTRY.as_bytes()).unwrap();
        // Corpus path under a regular file: saves must fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let mut session = CategorizationSession::new(
            registry,
            Matcher::default(),
            CorpusStore::new(blocker.join("references.csv")),
            TaxonomyStore::new(dir.path().join("categories.json")),
        )
        .unwrap();

        let path = dir.path().join("jan.csv");
        std::fs::write(
            &path,
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        )
        .unwrap();
        session.ingest(&[StatementFile::new(path)]);
        let id = session.pending_review().next().unwrap().id.clone();

        let err = session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Coffee".into()),
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::CorpusWrite(_)));

        // Memory and disk still agree: no learned pattern, transaction
        // still pending, and the taxonomy extension was rolled back in
        // memory and on disk.
        assert!(session.corpus().is_empty());
        assert_eq!(session.get(&id).unwrap().status, MatchStatus::Unmatched);
        assert!(session.taxonomy().is_empty());
        let tax = TaxonomyStore::new(dir.path().join("categories.json"))
            .load()
            .unwrap();
        assert!(tax.is_empty());
    }

    #[test]
    fn manual_correction_survives_reingest() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,GROCERY STORE,45.67\n",
        );
        fx.session.ingest(std::slice::from_ref(&file));
        let id = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap();

        // The learned pattern would now exact-match this description, but
        // the user's correction outranks the matcher on re-ingest.
        let summary = fx.session.ingest(&[file]);
        assert_eq!(summary.ingested, 1);
        assert_eq!(fx.session.working_set().count(), 1);
        let tx = fx.session.get(&id).unwrap();
        assert_eq!(tx.status, MatchStatus::Manual);
        assert_eq!(tx.category.as_deref(), Some("Food"));
    }

    #[test]
    fn refresh_resolves_pending_twins_after_correction() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n\
             2025-01-15,GROCERY STORE PURCHASE,45.67\n\
             2025-01-22,GROCERY STORE PURCHASE,12.00\n",
        );
        fx.session.ingest(&[file]);
        assert_eq!(fx.session.pending_review().count(), 2);

        let id = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap();

        let resolved = fx.session.refresh();
        assert_eq!(resolved, 1);
        assert_eq!(fx.session.pending_review().count(), 0);

        // The twin resolved as an exact corpus hit, not manual.
        let twin = fx
            .session
            .working_set()
            .find(|tx| tx.id != id)
            .unwrap();
        assert_eq!(twin.status, MatchStatus::Exact);
        assert_eq!(twin.category.as_deref(), Some("Food"));
    }

    #[test]
    fn refresh_leaves_manual_and_prior_matches_alone() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        );
        fx.session.ingest(&[file]);
        let id = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Coffee".into()),
            )
            .unwrap();

        assert_eq!(fx.session.refresh(), 0);
        assert_eq!(fx.session.get(&id).unwrap().status, MatchStatus::Manual);
    }

    #[test]
    fn second_ingest_auto_matches_learned_patterns() {
        let mut fx = fixture();
        let jan = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,GROCERY STORE PURCHASE,45.67\n",
        );
        fx.session.ingest(&[jan]);
        let id = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap();

        let feb = write_statement(
            fx.dir.path(),
            "feb.csv",
            "Transaction Date,Description,Amount\n2025-02-15,GROCERY STORE PURCHASE,30.00\n",
        );
        let summary = fx.session.ingest(&[feb]);
        assert_eq!(summary.auto_matched, 1);
        assert_eq!(summary.unmatched, 0);
    }

    #[test]
    fn totals_counts_and_completion() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n\
             2025-01-15,GROCERY STORE,45.00\n\
             2025-01-16,GROCERY STORE,15.00\n\
             2025-01-17,MYSTERY VENDOR,99.00\n",
        );
        fx.session.ingest(&[file]);
        let id = first_pending_id(&fx.session);
        fx.session
            .apply_correction(
                &id,
                CategoryChoice::New("Food".into()),
                CategoryChoice::New("Groceries".into()),
            )
            .unwrap();
        fx.session.refresh();

        let totals = fx.session.category_totals();
        let food = &totals[&("Food".to_string(), "Groceries".to_string())];
        assert_eq!(food.count, 2);
        assert_eq!(food.amount.to_cents(), 6000);

        let counts = fx.session.status_counts();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.manual, 1);
        assert_eq!(counts.exact, 1);
        assert_eq!(counts.unmatched, 1);

        let completion = fx.session.completion();
        assert!((completion - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn reingesting_the_same_file_does_not_duplicate() {
        let mut fx = fixture();
        let file = write_statement(
            fx.dir.path(),
            "jan.csv",
            "Transaction Date,Description,Amount\n2025-01-15,COFFEE,5.00\n",
        );
        fx.session.ingest(std::slice::from_ref(&file));
        fx.session.ingest(&[file]);
        assert_eq!(fx.session.working_set().count(), 1);
    }
}
