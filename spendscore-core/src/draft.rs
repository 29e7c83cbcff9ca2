//! Manual mapping: a person reviews the detected mapping, edits fields and confirms.

use crate::error::{MappingError, MappingIssue};
use crate::mapping::{self, ColumnMapping, Field};

/// Editable mapping for one file, with the auto-detected provenance flag.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingDraft {
    headers: Vec<String>,
    mapping: ColumnMapping,
    auto_detected: bool,
    errors: Vec<MappingIssue>,
}

impl MappingDraft {
    /// Start from a previously detected mapping, or detect one now.
    pub fn new(headers: Vec<String>, detected: Option<ColumnMapping>) -> Self {
        let (mapping, auto_detected) = match detected {
            Some(m) => (m, true),
            None => {
                let m = mapping::detect(&headers);
                let any = !m.is_empty();
                (m, any)
            }
        };
        Self {
            headers,
            mapping,
            auto_detected,
            errors: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn is_auto_detected(&self) -> bool {
        self.auto_detected
    }

    /// Issues from the last failed [`MappingDraft::confirm`].
    pub fn errors(&self) -> &[MappingIssue] {
        &self.errors
    }

    /// Rebind or unbind one field. Any edit drops the auto-detected flag.
    pub fn set(&mut self, field: Field, header: Option<&str>) -> Result<(), MappingError> {
        if let Some(h) = header.filter(|h| !h.is_empty()) {
            if !self.headers.iter().any(|known| known == h) {
                return Err(MappingError::UnknownHeader(h.to_string()));
            }
        }
        self.mapping.set(field, header.map(str::to_string));
        self.auto_detected = false;
        Ok(())
    }

    /// Throw away manual edits and detect again from the headers.
    pub fn reset(&mut self) {
        self.mapping = mapping::detect(&self.headers);
        self.auto_detected = true;
        self.errors.clear();
    }

    /// Validate and hand back the mapping. On failure the issues are kept for display.
    pub fn confirm(&mut self) -> Result<ColumnMapping, Vec<MappingIssue>> {
        self.errors = mapping::validate(&self.mapping);
        if self.errors.is_empty() {
            Ok(self.mapping.clone())
        } else {
            Err(self.errors.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        ["Date", "Payee", "Col3", "Memo"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_new_without_amount_still_flags_detected_fields() {
        let draft = MappingDraft::new(headers(), None);
        assert!(draft.is_auto_detected());
        assert_eq!(draft.mapping().get(Field::Vendor), Some("Payee"));
        assert_eq!(draft.mapping().get(Field::Amount), None);

        let blank = MappingDraft::new(vec!["X".to_string()], None);
        assert!(!blank.is_auto_detected());
    }

    #[test]
    fn test_confirm_rejects_then_accepts_after_edit() {
        let mut draft = MappingDraft::new(headers(), None);
        let issues = draft.confirm().unwrap_err();
        assert_eq!(issues, vec![MappingIssue::AmountRequired]);
        assert_eq!(draft.errors(), &[MappingIssue::AmountRequired]);

        draft.set(Field::Amount, Some("Col3")).unwrap();
        assert!(!draft.is_auto_detected());
        let mapping = draft.confirm().unwrap();
        assert_eq!(mapping.amount.as_deref(), Some("Col3"));
        assert!(draft.errors().is_empty());
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut draft = MappingDraft::new(headers(), None);
        draft.set(Field::Amount, Some("Col3")).unwrap();
        draft.set(Field::Category, Some("Col3")).unwrap();
        assert_eq!(draft.confirm().unwrap_err(), vec![MappingIssue::DuplicateColumn]);
    }

    #[test]
    fn test_unknown_header_rejected_without_change() {
        let mut draft = MappingDraft::new(headers(), None);
        let err = draft.set(Field::Amount, Some("Total")).unwrap_err();
        assert_eq!(err, MappingError::UnknownHeader("Total".to_string()));
        assert!(draft.is_auto_detected());
        assert_eq!(draft.mapping().get(Field::Amount), None);
    }

    #[test]
    fn test_unbind_and_reset() {
        let mut draft = MappingDraft::new(headers(), None);
        draft.set(Field::Vendor, None).unwrap();
        assert_eq!(draft.mapping().get(Field::Vendor), None);
        let _ = draft.confirm();

        draft.reset();
        assert!(draft.is_auto_detected());
        assert!(draft.errors().is_empty());
        assert_eq!(draft.mapping().get(Field::Vendor), Some("Payee"));
    }

    #[test]
    fn test_new_with_existing_mapping() {
        let given = ColumnMapping::default().with(Field::Amount, "Col3");
        let draft = MappingDraft::new(headers(), Some(given.clone()));
        assert!(draft.is_auto_detected());
        assert_eq!(draft.mapping(), &given);
    }
}
