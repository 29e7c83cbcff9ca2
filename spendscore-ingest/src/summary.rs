use std::collections::{BTreeMap, HashMap};

use crate::types::{NormalizedTransaction, TransactionSummary};

const TOP_VENDORS: usize = 10;

/// Totals and breakdowns over a normalized batch. Empty input yields all zeros.
pub fn summarize(transactions: &[NormalizedTransaction]) -> TransactionSummary {
    if transactions.is_empty() {
        return TransactionSummary::default();
    }

    let total_amount: f64 = transactions.iter().map(|t| t.amount).sum();
    let mut category_breakdown: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_vendor: HashMap<&str, f64> = HashMap::new();
    for t in transactions {
        *category_breakdown.entry(t.category.clone()).or_default() += t.amount;
        *by_vendor.entry(t.vendor.as_str()).or_default() += t.amount;
    }

    let mut top_vendors: Vec<(String, f64)> = by_vendor
        .into_iter()
        .map(|(v, amt)| (v.to_string(), amt))
        .collect();
    top_vendors.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_vendors.truncate(TOP_VENDORS);

    TransactionSummary {
        total_transactions: transactions.len(),
        total_amount,
        average_amount: total_amount / transactions.len() as f64,
        category_breakdown,
        top_vendors,
    }
}
