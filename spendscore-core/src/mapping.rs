//! Column mapping: which raw CSV header feeds which logical transaction field.
//!
//! Detection is deterministic keyword matching, case-insensitive, one pass per
//! field, first header in file order wins. Fields scan independently, so a header
//! such as "Account Name" can be bound to both `category` and `vendor`.
//! Detection does not prevent that. [`validate`] reports it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::{MappingError, MappingIssue};
use crate::sample::RawRow;

/// Rows shown by [`preview`].
pub const PREVIEW_ROWS: usize = 5;

/// Logical transaction fields a CSV column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Date,
    Description,
    Amount,
    Category,
    Vendor,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Date,
        Field::Description,
        Field::Amount,
        Field::Category,
        Field::Vendor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Date => "date",
            Field::Description => "description",
            Field::Amount => "amount",
            Field::Category => "category",
            Field::Vendor => "vendor",
        }
    }

    /// Label used when asking a person to pick a column.
    pub fn label(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Description => "Description",
            Field::Amount => "Amount",
            Field::Category => "Category",
            Field::Vendor => "Vendor/Merchant",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Field::Amount)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Field::ALL
            .into_iter()
            .find(|f| f.as_str() == lower)
            .ok_or_else(|| MappingError::UnknownField(s.to_string()))
    }
}

/// Keyword set for one field. `contains` matches anywhere in the lower-cased
/// header, `exact` only matches the whole lower-cased header.
struct KeywordRule {
    field: Field,
    contains: &'static [&'static str],
    exact: &'static [&'static str],
}

impl KeywordRule {
    fn matches(&self, lower: &str) -> bool {
        self.contains.iter().any(|k| lower.contains(k)) || self.exact.contains(&lower)
    }
}

const RULES: [KeywordRule; 5] = [
    KeywordRule {
        field: Field::Date,
        contains: &["date", "time"],
        exact: &["transaction date", "txn date", "posted", "posting date", "completed date"],
    },
    KeywordRule {
        field: Field::Amount,
        contains: &[
            "amount",
            "total",
            "price",
            "cost",
            "value",
            "debit",
            "credit",
            "transaction value",
            "payment amount",
        ],
        exact: &[],
    },
    KeywordRule {
        field: Field::Description,
        contains: &["description", "memo", "details", "reference", "notes", "comment"],
        exact: &[],
    },
    KeywordRule {
        field: Field::Category,
        contains: &["category", "class", "type", "account", "classification"],
        exact: &[],
    },
    KeywordRule {
        field: Field::Vendor,
        contains: &[
            "vendor",
            "payee",
            "merchant",
            "supplier",
            "name",
            "counterparty",
            "recipient",
            "business name",
            "company",
        ],
        exact: &[],
    },
];

/// Binding of logical fields to raw header names.
///
/// Serializes with every field present and unbound fields as `""`, which is the
/// shape the upload endpoint expects in its `mapping` form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default, with = "blank_as_none")]
    pub date: Option<String>,
    #[serde(default, with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default, with = "blank_as_none")]
    pub amount: Option<String>,
    #[serde(default, with = "blank_as_none")]
    pub category: Option<String>,
    #[serde(default, with = "blank_as_none")]
    pub vendor: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Bind or unbind a field. Empty header names unbind.
    pub fn set(&mut self, field: Field, header: Option<String>) {
        *self.slot_mut(field) = header.filter(|h| !h.is_empty());
    }

    pub fn with(mut self, field: Field, header: impl Into<String>) -> Self {
        self.set(field, Some(header.into()));
        self
    }

    /// Bound fields in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL
            .into_iter()
            .filter_map(|f| self.get(f).map(|h| (f, h)))
    }

    pub fn is_empty(&self) -> bool {
        self.bindings().next().is_none()
    }

    /// Parse a `field=header` override, as given on the command line.
    pub fn parse_override(raw: &str) -> Result<(Field, Option<String>), MappingError> {
        let (field, header) = raw
            .split_once('=')
            .ok_or_else(|| MappingError::InvalidOverride(raw.to_string()))?;
        let field: Field = field.parse()?;
        let header = header.trim();
        Ok((field, (!header.is_empty()).then(|| header.to_string())))
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Date => &self.date,
            Field::Description => &self.description,
            Field::Amount => &self.amount,
            Field::Category => &self.category,
            Field::Vendor => &self.vendor,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Date => &mut self.date,
            Field::Description => &mut self.description,
            Field::Amount => &mut self.amount,
            Field::Category => &mut self.category,
            Field::Vendor => &mut self.vendor,
        }
    }
}

mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

/// Guess a mapping from raw header names. Never fails; no match leaves a field unbound.
pub fn detect<S: AsRef<str>>(headers: &[S]) -> ColumnMapping {
    let lowered: Vec<String> = headers.iter().map(|h| h.as_ref().to_lowercase()).collect();
    let mut mapping = ColumnMapping::default();

    for rule in &RULES {
        if let Some(idx) = lowered.iter().position(|h| rule.matches(h)) {
            mapping.set(rule.field, Some(headers[idx].as_ref().to_string()));
        }
    }

    debug!(headers = headers.len(), bound = mapping.bindings().count(), "detected column mapping");
    mapping
}

/// Check a mapping before use. An empty result means the mapping is valid.
pub fn validate(mapping: &ColumnMapping) -> Vec<MappingIssue> {
    let mut issues = Vec::new();

    if mapping.amount.is_none() {
        issues.push(MappingIssue::AmountRequired);
    }

    let mut seen = HashSet::new();
    if mapping.bindings().any(|(_, header)| !seen.insert(header)) {
        issues.push(MappingIssue::DuplicateColumn);
    }

    issues
}

/// Leading rows for display. Values are passed through untouched.
pub fn preview(rows: &[RawRow]) -> &[RawRow] {
    &rows[..rows.len().min(PREVIEW_ROWS)]
}
