use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

/// How a transaction was (or was not) assigned its category.
///
/// `Manual` is terminal: a user-corrected transaction is never handed back
/// to the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Exact,
    Fuzzy,
    Unmatched,
    Manual,
}

impl MatchStatus {
    pub fn is_categorized(self) -> bool {
        self != MatchStatus::Unmatched
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Exact => "exact",
            MatchStatus::Fuzzy => "fuzzy",
            MatchStatus::Unmatched => "unmatched",
            MatchStatus::Manual => "manual",
        };
        f.write_str(s)
    }
}

/// Stable identity for one parsed row.
///
/// Derived from file identity + source + row position rather than a content
/// hash: two identical rows in the same statement are legitimately distinct
/// transactions and must not collapse into one key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn derive(file: &str, source_id: &str, row: usize) -> Self {
        TransactionId(format!("{file}:{source_id}:{row}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical transaction record, the common schema every source layout is
/// parsed into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source_id: String,
    pub date: NaiveDate,
    /// Raw statement text, trimmed, case preserved.
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub status: MatchStatus,
    /// Similarity score in [0, 100]; populated only for fuzzy matches.
    pub match_score: Option<f32>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        source_id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        amount: Money,
    ) -> Self {
        Transaction {
            id,
            source_id: source_id.into(),
            date,
            description: description.into(),
            amount,
            category: None,
            sub_category: None,
            status: MatchStatus::Unmatched,
            match_score: None,
        }
    }

    pub fn is_categorized(&self) -> bool {
        self.status.is_categorized()
    }

    /// Clears any assigned category and returns to `Unmatched`.
    pub fn clear_assignment(&mut self) {
        self.category = None;
        self.sub_category = None;
        self.status = MatchStatus::Unmatched;
        self.match_score = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_transaction_starts_unmatched() {
        let tx = Transaction::new(
            TransactionId::derive("jan.csv", "chase", 3),
            "chase",
            date(2025, 1, 15),
            "GROCERY STORE PURCHASE",
            Money::from_cents(4567),
        );
        assert_eq!(tx.status, MatchStatus::Unmatched);
        assert!(tx.category.is_none());
        assert!(tx.match_score.is_none());
        assert!(!tx.is_categorized());
    }

    #[test]
    fn id_is_deterministic_and_position_sensitive() {
        let a = TransactionId::derive("jan.csv", "chase", 3);
        let b = TransactionId::derive("jan.csv", "chase", 3);
        let c = TransactionId::derive("jan.csv", "chase", 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn manual_counts_as_categorized() {
        assert!(MatchStatus::Manual.is_categorized());
        assert!(MatchStatus::Exact.is_categorized());
        assert!(MatchStatus::Fuzzy.is_categorized());
        assert!(!MatchStatus::Unmatched.is_categorized());
    }

    #[test]
    fn clear_assignment_resets_all_match_state() {
        let mut tx = Transaction::new(
            TransactionId::derive("jan.csv", "chase", 0),
            "chase",
            date(2025, 1, 15),
            "STARBUCKS",
            Money::from_cents(500),
        );
        tx.category = Some("Food".into());
        tx.sub_category = Some("Coffee".into());
        tx.status = MatchStatus::Fuzzy;
        tx.match_score = Some(92.5);

        tx.clear_assignment();
        assert_eq!(tx.status, MatchStatus::Unmatched);
        assert!(tx.category.is_none() && tx.sub_category.is_none());
        assert!(tx.match_score.is_none());
    }
}
