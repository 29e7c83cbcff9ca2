//! Error taxonomy shared by every upload pipeline.

use thiserror::Error;

/// A single reason a column mapping cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MappingIssue {
    #[error("Amount column is required")]
    AmountRequired,
    #[error("Each column can only be mapped once")]
    DuplicateColumn,
}

impl MappingIssue {
    /// Human-readable form of a validation result, in order.
    pub fn messages(issues: &[MappingIssue]) -> Vec<String> {
        issues.iter().map(ToString::to_string).collect()
    }
}

/// Failures scoped to one file's pipeline. None of these are fatal to the process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Not enough CSV content to hold a header and one data row.
    #[error("{0}")]
    MalformedInput(String),

    /// Detection could not find an amount column; manual mapping can recover.
    #[error("Could not auto-detect amount column. Manual mapping required.")]
    MappingIncomplete,

    /// A user supplied mapping failed validation. Nothing was submitted.
    #[error("{}", MappingIssue::messages(.0).join("; "))]
    MappingInvalid(Vec<MappingIssue>),

    /// Network failure, timeout or a non-2xx response.
    #[error("{0}")]
    Transport(String),

    /// A 2xx response whose body is not a JSON object.
    #[error("{0}")]
    InvalidResponse(String),
}

impl PipelineError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Errors from editing a mapping by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("column '{0}' does not exist in this file")]
    UnknownHeader(String),

    #[error("unknown field '{0}' (expected date, description, amount, category or vendor)")]
    UnknownField(String),

    #[error("invalid mapping override '{0}' (expected field=header)")]
    InvalidOverride(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        assert_eq!(MappingIssue::AmountRequired.to_string(), "Amount column is required");
        assert_eq!(
            MappingIssue::DuplicateColumn.to_string(),
            "Each column can only be mapped once"
        );
    }

    #[test]
    fn test_mapping_invalid_joins_issues() {
        let err = PipelineError::MappingInvalid(vec![
            MappingIssue::AmountRequired,
            MappingIssue::DuplicateColumn,
        ]);
        assert_eq!(
            err.to_string(),
            "Amount column is required; Each column can only be mapped once"
        );
    }
}
