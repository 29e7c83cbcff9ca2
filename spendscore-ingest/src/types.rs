use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";
pub const UNCATEGORIZED: &str = "Uncategorized";

/// One mapped row, ready for spend analysis (source-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Absolute spend amount. Sign is dropped.
    pub amount: f64,
    pub vendor: String,
    pub date: Option<NaiveDate>,
    pub category: String,
    pub description: String,
    /// 1-based line in the source file.
    pub line: u64,
}

/// Output of [`crate::normalize`]: the rows that survived plus per-row notes for the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedBatch {
    pub transactions: Vec<NormalizedTransaction>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub total_transactions: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    pub category_breakdown: BTreeMap<String, f64>,
    /// Highest spend first, at most ten.
    pub top_vendors: Vec<(String, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_json_shape() {
        let t = NormalizedTransaction {
            amount: 12.5,
            vendor: "Figma".into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 2),
            category: UNCATEGORIZED.into(),
            description: String::new(),
            line: 4,
        };
        let v = serde_json::to_value(&t).unwrap();
        assert_eq!(v["date"], "2026-01-02");
        assert_eq!(v["category"], "Uncategorized");
        let back: NormalizedTransaction = serde_json::from_value(v).unwrap();
        assert_eq!(back, t);
    }
}
