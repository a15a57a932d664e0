use async_trait::async_trait;
use bibres_core::{CitationRecord, IdentifierKind, ValidationOutcome};

use crate::error::{ResolveError, Result};
use crate::identifiers;
use crate::sources::Validator;

pub const FORMAT_VALIDATOR: &str = "format";

/// Offline validator: passes when the record carries at least one
/// identifier and every identifier on it is well-formed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatValidator;

impl FormatValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, record: &CitationRecord) -> ValidationOutcome {
        let present: Vec<(IdentifierKind, &str)> = IdentifierKind::ALL
            .iter()
            .filter_map(|kind| record.identifier(*kind).map(|value| (*kind, value)))
            .collect();

        let well_formed = !present.is_empty()
            && present
                .iter()
                .all(|(kind, value)| identifiers::normalize(*kind, value).is_some());

        if well_formed {
            ValidationOutcome::Passed
        } else {
            ValidationOutcome::Failed
        }
    }
}

#[async_trait]
impl Validator for FormatValidator {
    fn name(&self) -> &str {
        FORMAT_VALIDATOR
    }

    async fn validate(&self, record: &CitationRecord) -> Result<ValidationOutcome> {
        Ok(self.check(record))
    }
}

/// Instantiate a built-in validator by its configured name.
pub fn builtin_validator(name: &str) -> Result<Box<dyn Validator>> {
    match name.trim() {
        FORMAT_VALIDATOR => Ok(Box::new(FormatValidator::new())),
        other => Err(ResolveError::collaborator(
            "validator registry",
            format!("unknown built-in validator: {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(kind: IdentifierKind, value: &str) -> CitationRecord {
        let mut record = CitationRecord::bare("1", "https://example.org");
        *record.identifier_slot(kind) = Some(value.to_string());
        record
    }

    #[test]
    fn passes_on_well_formed_identifiers() {
        let mut record = record_with(IdentifierKind::Pmid, "12345");
        record.doi = Some("10.1/x".to_string());
        assert_eq!(FormatValidator::new().check(&record), ValidationOutcome::Passed);
    }

    #[test]
    fn fails_on_malformed_identifier() {
        let mut record = record_with(IdentifierKind::Pmid, "12345");
        record.pmcid = Some("PMCabc".to_string());
        assert_eq!(FormatValidator::new().check(&record), ValidationOutcome::Failed);
    }

    #[test]
    fn fails_without_identifiers() {
        let record = CitationRecord::bare("1", "https://example.org");
        assert_eq!(FormatValidator::new().check(&record), ValidationOutcome::Failed);
    }

    #[test]
    fn registry_knows_format_only() {
        assert_eq!(builtin_validator("format").unwrap().name(), "format");
        assert!(builtin_validator("ncbi").is_err());
    }
}
