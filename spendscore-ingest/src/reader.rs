//! CSV tokenizing into headers and raw rows.
//!
//! Quoted fields with embedded commas, newlines and `""` escapes are handled
//! by the `csv` crate. Lines that are empty or whitespace-only are skipped entirely.

use csv::{ReaderBuilder, StringRecord, Trim};
use spendscore_core::mapping::PREVIEW_ROWS;
use spendscore_core::{CsvSample, PipelineError};
use std::borrow::Cow;
use tracing::debug;

const TOO_SHORT: &str = "CSV file must have at least 2 lines (header + data)";

/// Decode file bytes, replacing invalid UTF-8 and dropping a leading BOM.
pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}

/// Header row plus every non-blank data record.
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl Table {
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// A line with no content at all. Delimiter-only lines such as `,` still count as rows.
fn is_blank_line(record: &StringRecord) -> bool {
    record.len() <= 1 && record.iter().all(|f| f.trim().is_empty())
}

pub(crate) fn read_table(text: &str) -> Result<Table, PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut records = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::malformed(format!("CSV parse error: {e}")))?;
        if is_blank_line(&record) {
            continue;
        }
        match headers {
            None => headers = Some(record.iter().map(|h| h.trim().to_string()).collect()),
            Some(_) => records.push(record),
        }
    }

    let headers = headers.ok_or_else(|| PipelineError::malformed(TOO_SHORT))?;
    Ok(Table { headers, records })
}

/// Read the header and a few leading rows for mapping and display.
///
/// Fails with `MalformedInput` unless there is a header and at least one data record.
pub fn read_sample(bytes: &[u8]) -> Result<CsvSample, PipelineError> {
    let text = decode(bytes);
    let table = read_table(&text)?;
    if table.records.is_empty() {
        return Err(PipelineError::malformed(TOO_SHORT));
    }

    let rows = table
        .records
        .iter()
        .take(PREVIEW_ROWS)
        .map(|r| CsvSample::row_from_cells(&table.headers, &r.iter().collect::<Vec<_>>()))
        .collect();

    debug!(
        columns = table.headers.len(),
        rows = table.records.len(),
        "read CSV sample"
    );
    Ok(CsvSample::new(table.headers, rows, table.records.len()))
}
