//! Plain-text rendering for command output.

use spendscore_core::{ColumnMapping, Field, RawRow, UploadSummary};
use spendscore_ingest::{NormalizedTransaction, TransactionSummary};

pub fn mapping_lines(mapping: &ColumnMapping) -> Vec<String> {
    Field::ALL
        .iter()
        .map(|&field| {
            let marker = if field.is_required() { "*" } else { " " };
            let target = mapping.get(field).unwrap_or("(not mapped)");
            format!("{marker} {:<16} -> {target}", field.label())
        })
        .collect()
}

/// Header line followed by one line per row, cells in header order.
pub fn preview_lines(headers: &[String], rows: &[RawRow]) -> Vec<String> {
    let mut out = vec![headers.join(" | ")];
    out.extend(rows.iter().map(|row| {
        headers
            .iter()
            .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" | ")
    }));
    out
}

pub fn upload_summary_lines(file_name: &str, summary: &UploadSummary) -> Vec<String> {
    let insights = &summary.insights;
    let mut out = vec![
        format!("{file_name}: analysis complete"),
        format!("  transactions processed: {}", summary.transactions_processed),
        format!("  spend score:            {}", summary.spend_score),
        format!("  waste detected:         {}%", insights.waste_detected),
        format!("  duplicates found:       {}", insights.duplicates_found),
    ];
    if !insights.top_categories.is_empty() {
        out.push(format!("  top categories:         {}", insights.top_categories.join(", ")));
    }
    out.push("  recommendations:".to_string());
    out.extend(insights.recommendations.iter().map(|r| format!("    - {r}")));
    out
}

pub fn transaction_line(t: &NormalizedTransaction) -> String {
    let date = t
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!(
        "{date}  {:>12.2}  {:<24}  {:<18}  {}",
        t.amount, t.vendor, t.category, t.description
    )
}

pub fn totals_lines(summary: &TransactionSummary) -> Vec<String> {
    let mut out = vec![
        format!("transactions: {}", summary.total_transactions),
        format!("total:        {:.2}", summary.total_amount),
        format!("average:      {:.2}", summary.average_amount),
    ];
    if !summary.category_breakdown.is_empty() {
        out.push("by category:".to_string());
        out.extend(
            summary
                .category_breakdown
                .iter()
                .map(|(c, amt)| format!("  {c:<24} {amt:>12.2}")),
        );
    }
    if !summary.top_vendors.is_empty() {
        out.push("top vendors:".to_string());
        out.extend(
            summary
                .top_vendors
                .iter()
                .map(|(v, amt)| format!("  {v:<24} {amt:>12.2}")),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mapping_lines() {
        let m = ColumnMapping::default().with(Field::Amount, "Total");
        let lines = mapping_lines(&m);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Date") && lines[0].ends_with("(not mapped)"));
        assert!(lines[2].starts_with('*') && lines[2].ends_with("-> Total"));
    }

    #[test]
    fn test_preview_lines_follow_header_order() {
        let headers = vec!["B".to_string(), "A".to_string()];
        let mut row = RawRow::new();
        row.insert("A".to_string(), "1".to_string());
        row.insert("B".to_string(), "2".to_string());
        assert_eq!(preview_lines(&headers, &[row]), vec!["B | A", "2 | 1"]);
    }

    #[test]
    fn test_upload_summary_lines() {
        let s = UploadSummary::from_response(json!({
            "spend_score": 80,
            "score_breakdown": { "waste_ratio": 0.25 },
        }))
        .unwrap();
        let lines = upload_summary_lines("q1.csv", &s);
        assert_eq!(lines[0], "q1.csv: analysis complete");
        assert!(lines.iter().any(|l| l.ends_with("25%")));
        assert!(!lines.iter().any(|l| l.contains("top categories")));
        assert_eq!(lines.last().unwrap(), "    - View detailed insights in the Insights section");
    }
}
