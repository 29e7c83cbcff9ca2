//! Raw CSV rows as read from an uploaded file, before any mapping is applied.

use serde::Serialize;
use std::collections::BTreeMap;

/// One data row: header name -> trimmed cell text.
pub type RawRow = BTreeMap<String, String>;

/// What the pipeline keeps from a file read: the header row plus a few rows for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvSample {
    /// Header names in file order.
    pub headers: Vec<String>,
    /// Leading data rows, at most [`crate::mapping::PREVIEW_ROWS`].
    pub rows: Vec<RawRow>,
    /// Count of every non-blank data record in the file.
    pub total_rows: usize,
}

impl CsvSample {
    pub fn new(headers: Vec<String>, rows: Vec<RawRow>, total_rows: usize) -> Self {
        Self {
            headers,
            rows,
            total_rows,
        }
    }

    /// Build a row from header order and cell values. Missing cells become empty strings.
    /// A repeated header keeps its first column's value.
    pub fn row_from_cells<S: AsRef<str>>(headers: &[String], cells: &[S]) -> RawRow {
        let mut row = RawRow::new();
        for (i, h) in headers.iter().enumerate() {
            let value = cells.get(i).map(|c| c.as_ref().trim()).unwrap_or("");
            row.entry(h.clone()).or_insert_with(|| value.to_string());
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_cells_pads_missing_and_drops_extra() {
        let headers = vec!["Date".to_string(), "Amount".to_string(), "Memo".to_string()];
        let row = CsvSample::row_from_cells(&headers, &["2026-01-02", " 12.50 "]);
        assert_eq!(row["Date"], "2026-01-02");
        assert_eq!(row["Amount"], "12.50");
        assert_eq!(row["Memo"], "");

        let row = CsvSample::row_from_cells(&headers, &["a", "b", "c", "d"]);
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_repeated_header_keeps_first_column() {
        let headers = vec!["Amount".to_string(), "Memo".to_string(), "Amount".to_string()];
        let row = CsvSample::row_from_cells(&headers, &["12.00", "lunch", "99.00"]);
        assert_eq!(row.len(), 2);
        assert_eq!(row["Amount"], "12.00");
    }
}
