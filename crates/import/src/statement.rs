use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use tally_core::{Money, Transaction, TransactionId};

use crate::layout::{AmountColumns, CanonicalField, LayoutRegistry, SignConvention, SourceLayout};

/// Date formats accepted across the registered sources, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%m-%d-%Y", "%m-%d-%y", "%Y/%m/%d",
];

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No layout registered for source '{0}'")]
    UnknownSource(String),
    #[error("No header row for source '{0}' found in file")]
    HeaderNotFound(String),
    #[error("Header row is missing the {field} column ('{header}')")]
    MissingColumn {
        field: CanonicalField,
        header: String,
    },
}

/// A data row that was skipped without aborting the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Zero-based record index within the file.
    pub row: usize,
    pub kind: RowErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowErrorKind {
    BadDate(String),
    BadAmount(String),
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            RowErrorKind::BadDate(raw) => write!(f, "row {}: unparseable date '{raw}'", self.row),
            RowErrorKind::BadAmount(raw) => {
                write!(f, "row {}: unparseable amount '{raw}'", self.row)
            }
        }
    }
}

/// Outcome of parsing one statement file. Row-level failures never abort
/// the file; they land in `skipped`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<RowError>,
    pub dropped_empty_descriptions: usize,
}

/// Parses one raw statement into canonical transactions using the layout
/// registered for `source_id`. `file_name` seeds the deterministic
/// transaction ids. Pure with respect to corpus and taxonomy.
pub fn parse(
    text: &str,
    file_name: &str,
    source_id: &str,
    registry: &LayoutRegistry,
) -> Result<ParseReport, ParseError> {
    let layout = registry
        .get(source_id)
        .ok_or_else(|| ParseError::UnknownSource(source_id.to_string()))?;
    parse_with_layout(text, file_name, layout)
}

/// Like [`parse`] but with a layout already in hand (after `detect`).
pub fn parse_with_layout(
    text: &str,
    file_name: &str,
    layout: &SourceLayout,
) -> Result<ParseReport, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for result in reader.records() {
        records.push(result?);
    }

    // Statement exports often carry preamble lines before the real header,
    // so the header row is located rather than assumed to be line 1. A line
    // carrying every layout header wins; the date-column fallback keeps the
    // error precise when the file's header row lost a sibling column.
    let header_idx = records
        .iter()
        .position(|r| {
            layout
                .header_row
                .iter()
                .all(|h| find_column(r, h).is_some())
        })
        .or_else(|| {
            records
                .iter()
                .position(|r| find_column(r, &layout.field_map.date).is_some())
        })
        .ok_or_else(|| ParseError::HeaderNotFound(layout.source_id.to_string()))?;
    let header = &records[header_idx];

    let missing = |field, header: &str| ParseError::MissingColumn {
        field,
        header: header.to_string(),
    };

    let date_col = find_column(header, &layout.field_map.date)
        .ok_or_else(|| missing(CanonicalField::Date, &layout.field_map.date))?;
    let desc_col = find_column(header, &layout.field_map.description)
        .ok_or_else(|| missing(CanonicalField::Description, &layout.field_map.description))?;
    let amount_cols = match &layout.field_map.amount {
        AmountColumns::Single { header: h, sign } => ResolvedAmount::Single {
            col: find_column(header, h).ok_or_else(|| missing(CanonicalField::Amount, h))?,
            sign: *sign,
        },
        AmountColumns::DebitCredit { debit, credit } => ResolvedAmount::DebitCredit {
            debit: find_column(header, debit)
                .ok_or_else(|| missing(CanonicalField::Amount, debit))?,
            credit: find_column(header, credit)
                .ok_or_else(|| missing(CanonicalField::Amount, credit))?,
        },
    };

    let mut report = ParseReport::default();
    for (row, record) in records.iter().enumerate().skip(header_idx + 1) {
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let raw_date = cell(record, date_col);
        if raw_date.is_empty() {
            // Separator and summary lines carry no date.
            continue;
        }
        let date = match parse_date(raw_date) {
            Some(d) => d,
            None => {
                report.skipped.push(RowError {
                    row,
                    kind: RowErrorKind::BadDate(raw_date.to_string()),
                });
                continue;
            }
        };

        let description = cell(record, desc_col);
        if description.is_empty() {
            tracing::warn!(row, file = file_name, "dropping row with empty description");
            report.dropped_empty_descriptions += 1;
            continue;
        }

        let amount = match resolve_amount(record, &amount_cols) {
            Ok(Some(amount)) => amount,
            Ok(None) => continue,
            Err(raw) => {
                report.skipped.push(RowError {
                    row,
                    kind: RowErrorKind::BadAmount(raw),
                });
                continue;
            }
        };

        report.transactions.push(Transaction::new(
            TransactionId::derive(file_name, &layout.source_id, row),
            layout.source_id.clone(),
            date,
            description,
            amount,
        ));
    }

    Ok(report)
}

enum ResolvedAmount {
    Single { col: usize, sign: SignConvention },
    DebitCredit { debit: usize, credit: usize },
}

/// `Ok(None)` means the row has no amount at all and is silently skipped.
/// `Err` carries the raw cell text for the row error.
fn resolve_amount(
    record: &csv::StringRecord,
    cols: &ResolvedAmount,
) -> Result<Option<Money>, String> {
    match cols {
        ResolvedAmount::Single { col, sign } => {
            let raw = cell(record, *col);
            if raw.is_empty() {
                return Ok(None);
            }
            let value = parse_amount(raw).ok_or_else(|| raw.to_string())?;
            let value = match sign {
                SignConvention::ExpensePositive => value,
                SignConvention::LedgerSigned => -value,
            };
            Ok(Some(Money::from_decimal(value)))
        }
        ResolvedAmount::DebitCredit { debit, credit } => {
            let raw_debit = cell(record, *debit);
            let raw_credit = cell(record, *credit);
            if raw_debit.is_empty() && raw_credit.is_empty() {
                return Ok(None);
            }
            let d = if raw_debit.is_empty() {
                Decimal::ZERO
            } else {
                parse_amount(raw_debit).ok_or_else(|| raw_debit.to_string())?
            };
            let c = if raw_credit.is_empty() {
                Decimal::ZERO
            } else {
                parse_amount(raw_credit).ok_or_else(|| raw_credit.to_string())?
            };
            Ok(Some(Money::from_decimal(d - c)))
        }
    }
}

fn cell<'r>(record: &'r csv::StringRecord, col: usize) -> &'r str {
    record.get(col).unwrap_or_default().trim()
}

fn find_column(record: &csv::StringRecord, header: &str) -> Option<usize> {
    record
        .iter()
        .position(|c| c.trim().eq_ignore_ascii_case(header))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    let (negative, s) = if s.starts_with('(') && s.ends_with(')') {
        (true, &s[1..s.len() - 1])
    } else {
        (false, s)
    };
    let cleaned = s.replace([',', '$', ' '], "");
    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}
