use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// The three fields every source layout must resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Date,
    Description,
    Amount,
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CanonicalField::Date => "date",
            CanonicalField::Description => "description",
            CanonicalField::Amount => "amount",
        };
        f.write_str(s)
    }
}

/// How a single-amount column encodes sign.
///
/// `LedgerSigned` sources write expenses as negative numbers; the parser
/// inverts them so the canonical amount is expense-positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignConvention {
    #[default]
    ExpensePositive,
    LedgerSigned,
}

/// Which header(s) carry the amount for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountColumns {
    Single {
        header: String,
        sign: SignConvention,
    },
    /// Amount = debit − credit, already expense-positive.
    DebitCredit { debit: String, credit: String },
}

/// Canonical field → literal header token, resolved against the registry
/// row at load time. Positions are re-resolved against each file's actual
/// header row at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub date: String,
    pub description: String,
    pub amount: AmountColumns,
}

/// One source's export format: the literal column headers as they appear in
/// that source's files, plus the derived field map. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub source_id: String,
    pub header_row: Vec<String>,
    pub field_map: FieldMap,
}

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Layout '{source_id}' does not resolve the {field} field")]
    UnresolvedField {
        source_id: String,
        field: CanonicalField,
    },
    #[error("Duplicate source id in registry: {0}")]
    DuplicateSource(String),
}

// Alias tables for canonical fields. Explicit and versioned here rather
// than inferred ad hoc per file; extend them when a new export format
// shows up with a new header spelling.
const DESCRIPTION_ALIASES: &[&str] = &["description", "payee"];
const AMOUNT_ALIASES: &[&str] = &["amount"];
const DEBIT_ALIASES: &[&str] = &["debit", "withdrawals"];
const CREDIT_ALIASES: &[&str] = &["credit", "deposits"];

fn is_date_header(header: &str) -> bool {
    header.to_lowercase().contains("date")
}

fn is_description_header(header: &str) -> bool {
    let h = header.to_lowercase();
    DESCRIPTION_ALIASES.iter().any(|a| h.contains(a))
}

fn eq_any(header: &str, aliases: &[&str]) -> bool {
    aliases.iter().any(|a| header.eq_ignore_ascii_case(a))
}

fn sign_marker(token: &str) -> Option<SignConvention> {
    match token.to_lowercase().as_str() {
        "ledger-signed" => Some(SignConvention::LedgerSigned),
        "expense-positive" => Some(SignConvention::ExpensePositive),
        _ => None,
    }
}

/// The registry of every known source layout (the Pattern Table).
///
/// File format, one row per source:
/// `source_id[,sign-marker],Header1,Header2,...` where the optional marker
/// is `ledger-signed` or `expense-positive` (default). Loaded once at
/// session start; edits happen out-of-band.
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: Vec<SourceLayout>,
}

impl LayoutRegistry {
    pub fn from_path(path: &Path) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_reader(text.as_bytes())
    }

    pub fn from_reader<R: Read>(data: R) -> Result<Self, LayoutError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut layouts: Vec<SourceLayout> = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut cells = record.iter().map(str::trim).filter(|c| !c.is_empty());
            let Some(source_id) = cells.next() else {
                continue;
            };

            let mut rest: Vec<&str> = cells.collect();
            let sign = match rest.first().copied().and_then(sign_marker) {
                Some(sign) => {
                    rest.remove(0);
                    sign
                }
                None => SignConvention::default(),
            };
            let header_row: Vec<String> = rest.iter().map(|h| h.to_string()).collect();

            if layouts.iter().any(|l| l.source_id == source_id) {
                return Err(LayoutError::DuplicateSource(source_id.to_string()));
            }

            let field_map = derive_field_map(source_id, &header_row, sign)?;
            layouts.push(SourceLayout {
                source_id: source_id.to_string(),
                header_row,
                field_map,
            });
        }

        Ok(LayoutRegistry { layouts })
    }

    pub fn get(&self, source_id: &str) -> Option<&SourceLayout> {
        self.layouts
            .iter()
            .find(|l| l.source_id.eq_ignore_ascii_case(source_id))
    }

    /// Scans a statement's text for a line containing every header token of
    /// some registered layout. First registry entry that matches wins.
    pub fn detect(&self, text: &str) -> Option<&SourceLayout> {
        for layout in &self.layouts {
            for line in text.lines() {
                let cells: Vec<&str> = line.split(',').map(str::trim).collect();
                if layout
                    .header_row
                    .iter()
                    .all(|h| cells.iter().any(|c| c.eq_ignore_ascii_case(h)))
                {
                    return Some(layout);
                }
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(|l| l.source_id.as_str())
    }
}

fn derive_field_map(
    source_id: &str,
    headers: &[String],
    sign: SignConvention,
) -> Result<FieldMap, LayoutError> {
    let unresolved = |field| LayoutError::UnresolvedField {
        source_id: source_id.to_string(),
        field,
    };

    let date = headers
        .iter()
        .find(|h| is_date_header(h.as_str()))
        .ok_or_else(|| unresolved(CanonicalField::Date))?
        .clone();

    let description = headers
        .iter()
        .find(|h| is_description_header(h.as_str()))
        .ok_or_else(|| unresolved(CanonicalField::Description))?
        .clone();

    let debit = headers.iter().find(|h| eq_any(h.as_str(), DEBIT_ALIASES));
    let credit = headers.iter().find(|h| eq_any(h.as_str(), CREDIT_ALIASES));
    let amount = match (debit, credit) {
        (Some(d), Some(c)) => AmountColumns::DebitCredit {
            debit: d.clone(),
            credit: c.clone(),
        },
        _ => {
            let single = headers
                .iter()
                .find(|h| eq_any(h.as_str(), AMOUNT_ALIASES))
                .ok_or_else(|| unresolved(CanonicalField::Amount))?;
            AmountColumns::Single {
                header: single.clone(),
                sign,
            }
        }
    };

    Ok(FieldMap {
        date,
        description,
        amount,
    })
}
