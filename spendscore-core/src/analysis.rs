//! Display-oriented summary of the server's analysis payload.
//!
//! The payload itself is opaque here. Missing or mistyped fields fall back to
//! defaults so a partial backend response still renders. Only a body that is not
//! a JSON object is an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::PipelineError;
use crate::mapping::ColumnMapping;

pub const DEFAULT_RECOMMENDATIONS: [&str; 2] = [
    "Upload processed successfully",
    "View detailed insights in the Insights section",
];

/// Message used when a failure carries no usable text.
pub const GENERIC_UPLOAD_FAILURE: &str = "Upload failed. Please try again.";

const TOP_CATEGORIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    /// Waste ratio as a rounded percentage.
    pub waste_detected: i64,
    pub duplicates_found: u64,
    pub top_categories: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub transactions_processed: u64,
    pub spend_score: f64,
    pub insights: Insights,
    pub raw_result: Value,
}

impl UploadSummary {
    pub fn from_response(body: Value) -> Result<Self, PipelineError> {
        if !body.is_object() {
            return Err(PipelineError::InvalidResponse(format!(
                "unexpected response from server: expected a JSON object, got {}",
                json_kind(&body)
            )));
        }

        let transactions_processed = body
            .pointer("/transaction_summary/total_transactions")
            .and_then(as_count)
            .unwrap_or(0);
        let spend_score = body.get("spend_score").and_then(Value::as_f64).unwrap_or(0.0);
        let waste_ratio = body
            .pointer("/score_breakdown/waste_ratio")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let duplicates_found = body
            .pointer("/score_breakdown/redundancy_count")
            .and_then(as_count)
            .unwrap_or(0);
        let top_categories = body
            .pointer("/transaction_summary/category_breakdown")
            .and_then(Value::as_object)
            .map(|breakdown| {
                let mut ranked: Vec<(&String, f64)> = breakdown
                    .iter()
                    .map(|(name, amount)| (name, amount.as_f64().unwrap_or(0.0)))
                    .collect();
                ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
                ranked
                    .into_iter()
                    .take(TOP_CATEGORIES)
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        let recommendations = body
            .pointer("/ai_insights/recommendations")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_else(|| DEFAULT_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            transactions_processed,
            spend_score,
            insights: Insights {
                waste_detected: (waste_ratio * 100.0).round() as i64,
                duplicates_found,
                top_categories,
                recommendations,
            },
            raw_result: body,
        })
    }
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Best message for a non-2xx upload response.
///
/// Prefers the body's `error` field, then the raw body text, then the status line.
pub fn failure_message(status: &str, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(parsed) => parsed
            .get("error")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Upload failed: {status}")),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("Upload failed: {status}"),
    }
}

/// Payload for persisting a completed upload as a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDraft {
    pub title: String,
    pub data: ReportData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportData {
    pub filename: String,
    pub transactions: u64,
    pub spend_score: f64,
    pub waste_percentage: i64,
    pub duplicates_found: u64,
    pub top_categories: Vec<String>,
    pub recommendations: Vec<String>,
    pub upload_timestamp: DateTime<Utc>,
    pub raw_analysis: Value,
    pub mapping_used: ColumnMapping,
}

impl ReportDraft {
    pub fn from_upload(
        file_name: &str,
        summary: &UploadSummary,
        mapping: &ColumnMapping,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: format!("Financial Analysis: {file_name}"),
            data: ReportData {
                filename: file_name.to_string(),
                transactions: summary.transactions_processed,
                spend_score: summary.spend_score,
                waste_percentage: summary.insights.waste_detected,
                duplicates_found: summary.insights.duplicates_found,
                top_categories: summary.insights.top_categories.clone(),
                recommendations: summary.insights.recommendations.clone(),
                upload_timestamp: uploaded_at,
                raw_analysis: summary.raw_result.clone(),
                mapping_used: mapping.clone(),
            },
        }
    }
}
