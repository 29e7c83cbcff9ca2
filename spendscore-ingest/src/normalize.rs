//! Apply a confirmed mapping to every data row of a file.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use spendscore_core::{ColumnMapping, Field, PipelineError};
use tracing::{debug, warn};

use crate::reader::read_table;
use crate::types::{NormalizedBatch, NormalizedTransaction, UNCATEGORIZED, UNKNOWN_VENDOR};

const CURRENCY_SYMBOLS: [char; 5] = ['£', '$', '€', '¥', '₹'];

/// Tried in order. Ambiguous day/month strings resolve to month-first.
const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%m.%d.%Y",
];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Parse an amount cell. Currency symbols, thousands separators and whitespace are ignored
/// and `(12.50)` reads as `-12.50`.
pub fn clean_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };
    if digits.is_empty() {
        return None;
    }
    let value: f64 = digits.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

struct Columns {
    amount: usize,
    date: Option<usize>,
    description: Option<usize>,
    category: Option<usize>,
    vendor: Option<usize>,
}

fn cell(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Turn every data row into a [`NormalizedTransaction`].
///
/// Rows with an unreadable or zero amount are dropped. Unreadable amounts and dates
/// produce a `Row N: ...` warning, where N is the line in the file.
pub fn normalize(text: &str, mapping: &ColumnMapping) -> Result<NormalizedBatch, PipelineError> {
    let amount_header = mapping
        .get(Field::Amount)
        .ok_or(PipelineError::MappingIncomplete)?;
    let table = read_table(text)?;

    let amount = table.column(amount_header).ok_or_else(|| {
        PipelineError::malformed(format!("Amount column '{amount_header}' not found in CSV file"))
    })?;
    let optional = |field: Field| {
        let header = mapping.get(field)?;
        let idx = table.column(header);
        if idx.is_none() {
            debug!(field = field.as_str(), header, "mapped column missing from file; using default");
        }
        idx
    };
    let cols = Columns {
        amount,
        date: optional(Field::Date),
        description: optional(Field::Description),
        category: optional(Field::Category),
        vendor: optional(Field::Vendor),
    };

    let mut batch = NormalizedBatch::default();
    for (i, record) in table.records.iter().enumerate() {
        let line = record.position().map(|p| p.line()).unwrap_or(i as u64 + 2);
        let raw_amount = record.get(cols.amount).unwrap_or("").trim();
        let Some(value) = clean_amount(raw_amount) else {
            warn!(line, raw_amount, "skipping row with unreadable amount");
            batch
                .warnings
                .push(format!("Row {line}: could not parse amount '{raw_amount}'"));
            continue;
        };
        if value.abs() < 0.01 {
            continue;
        }

        let date = match cell(record, cols.date) {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    batch
                        .warnings
                        .push(format!("Row {line}: unrecognized date '{raw}'"));
                }
                parsed
            }
            None => None,
        };

        batch.transactions.push(NormalizedTransaction {
            amount: value.abs(),
            vendor: cell(record, cols.vendor).unwrap_or(UNKNOWN_VENDOR).to_string(),
            date,
            category: cell(record, cols.category).unwrap_or(UNCATEGORIZED).to_string(),
            description: cell(record, cols.description).unwrap_or_default().to_string(),
            line,
        });
    }

    debug!(
        kept = batch.transactions.len(),
        warnings = batch.warnings.len(),
        "normalized rows"
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping::default()
            .with(Field::Date, "Date")
            .with(Field::Description, "Memo")
            .with(Field::Amount, "Amount")
            .with(Field::Category, "Category")
            .with(Field::Vendor, "Vendor")
    }

    #[test]
    fn test_clean_amount() {
        assert_eq!(clean_amount("12.50"), Some(12.5));
        assert_eq!(clean_amount("$1,234.56"), Some(1234.56));
        assert_eq!(clean_amount(" £ 3 "), Some(3.0));
        assert_eq!(clean_amount("(45.00)"), Some(-45.0));
        assert_eq!(clean_amount("-7"), Some(-7.0));
        assert_eq!(clean_amount("€(9)"), Some(-9.0));
        assert_eq!(clean_amount(""), None);
        assert_eq!(clean_amount("n/a"), None);
        assert_eq!(clean_amount("()"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(parse_date("2026-01-15"), d(2026, 1, 15));
        assert_eq!(parse_date("01/15/2026"), d(2026, 1, 15));
        assert_eq!(parse_date("15/01/2026"), d(2026, 1, 15));
        assert_eq!(parse_date("03/04/2026"), d(2026, 3, 4));
        assert_eq!(parse_date("2026-01-15 08:30:00"), d(2026, 1, 15));
        assert_eq!(parse_date("01/15/2026 23:59:59"), d(2026, 1, 15));
        assert_eq!(parse_date("15-01-2026"), d(2026, 1, 15));
        assert_eq!(parse_date("01-15-2026"), d(2026, 1, 15));
        assert_eq!(parse_date("15.01.2026"), d(2026, 1, 15));
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_normalize_rows() {
        let csv = "Date,Memo,Amount,Category,Vendor\n\
                   2026-01-02,Seats,\"$1,200.00\",Software,Figma\n\
                   2026-01-03,,(40.00),,\n\
                   2026-01-04,Refund,0.00,Software,Figma\n";
        let batch = normalize(csv, &mapping()).unwrap();
        assert!(batch.warnings.is_empty());
        assert_eq!(batch.transactions.len(), 2);

        let first = &batch.transactions[0];
        assert_eq!(first.amount, 1200.0);
        assert_eq!(first.vendor, "Figma");
        assert_eq!(first.description, "Seats");
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 1, 2));
        assert_eq!(first.line, 2);

        let second = &batch.transactions[1];
        assert_eq!(second.amount, 40.0);
        assert_eq!(second.vendor, UNKNOWN_VENDOR);
        assert_eq!(second.category, UNCATEGORIZED);
        assert_eq!(second.description, "");
    }

    #[test]
    fn test_bad_cells_become_warnings() {
        let csv = "Date,Memo,Amount,Category,Vendor\n\
                   someday,Lunch,12,Meals,Cafe\n\
                   2026-01-03,Lunch,twelve,Meals,Cafe\n";
        let batch = normalize(csv, &mapping()).unwrap();
        assert_eq!(batch.transactions.len(), 1);
        assert_eq!(batch.transactions[0].date, None);
        assert_eq!(
            batch.warnings,
            vec![
                "Row 2: unrecognized date 'someday'".to_string(),
                "Row 3: could not parse amount 'twelve'".to_string(),
            ]
        );
    }

    #[test]
    fn test_amount_required() {
        let m = ColumnMapping::default().with(Field::Vendor, "Vendor");
        let err = normalize("Vendor\nFigma\n", &m).unwrap_err();
        assert_eq!(err, PipelineError::MappingIncomplete);
    }

    #[test]
    fn test_missing_columns() {
        let m = ColumnMapping::default().with(Field::Amount, "Total");
        let err = normalize("Amount\n5\n", &m).unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(ref msg) if msg.contains("'Total'")));

        let m = ColumnMapping::default()
            .with(Field::Amount, "Amount")
            .with(Field::Vendor, "Payee");
        let batch = normalize("Amount\n5\n", &m).unwrap();
        assert_eq!(batch.transactions[0].vendor, UNKNOWN_VENDOR);
    }

    #[test]
    fn test_header_only_gives_empty_batch() {
        let batch = normalize("Date,Amount\n", &mapping().with(Field::Amount, "Amount")).unwrap();
        assert!(batch.transactions.is_empty());
    }
}
