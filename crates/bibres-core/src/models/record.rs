use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::csl::{CslDate, CslName};
use crate::models::identifier::IdentifierKind;

// ─── CitationRecord ─────────────────────────────────────────

/// One CSL-JSON item per input reference, plus a `resolution` block that
/// records how it was assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// The reference's `ref_id`.
    pub id: String,

    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "type")]
    pub csl_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub author: Vec<CslName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<CslDate>,

    #[serde(
        rename = "container-title",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub container_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    #[serde(rename = "DOI", default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(rename = "PMID", default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    #[serde(rename = "PMCID", default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,

    /// ref_id of the group's primary member; set by deduplication on every
    /// other member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,

    pub resolution: Resolution,
}

impl CitationRecord {
    /// A record carrying nothing but its position and source URL.
    pub fn bare(id: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: id.into(),
            url: url.clone(),
            csl_type: "webpage".to_string(),
            title: None,
            author: Vec::new(),
            issued: None,
            container_title: None,
            publisher: None,
            page: None,
            volume: None,
            issue: None,
            doi: None,
            pmid: None,
            pmcid: None,
            canonical_id: None,
            resolution: Resolution::new(url),
        }
    }

    pub fn identifier(&self, kind: IdentifierKind) -> Option<&str> {
        match kind {
            IdentifierKind::Doi => self.doi.as_deref(),
            IdentifierKind::Pmid => self.pmid.as_deref(),
            IdentifierKind::Pmcid => self.pmcid.as_deref(),
        }
    }

    pub fn identifier_slot(&mut self, kind: IdentifierKind) -> &mut Option<String> {
        match kind {
            IdentifierKind::Doi => &mut self.doi,
            IdentifierKind::Pmid => &mut self.pmid,
            IdentifierKind::Pmcid => &mut self.pmcid,
        }
    }

    pub fn has_identifier(&self) -> bool {
        IdentifierKind::ALL
            .iter()
            .any(|kind| self.identifier(*kind).is_some())
    }

    /// True when any bibliographic (non-identifier) field was populated.
    pub fn has_metadata(&self) -> bool {
        self.title.is_some()
            || !self.author.is_empty()
            || self.issued.is_some()
            || self.container_title.is_some()
            || self.publisher.is_some()
            || self.page.is_some()
            || self.volume.is_some()
            || self.issue.is_some()
    }

    /// At least one identifier or metadata field.
    pub fn is_resolved(&self) -> bool {
        self.has_identifier() || self.has_metadata()
    }
}

// ─── Resolution ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationOutcome {
    Passed,
    Failed,
    Skipped,
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Validator name → outcome, ordered by name.
pub type ValidationOutcomes = BTreeMap<String, ValidationOutcome>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Aggregate confidence in `[0, 1]`; 0 when nothing was found.
    pub confidence: f64,

    /// Extraction methods in attempt order.
    #[serde(default)]
    pub methods: Vec<String>,

    #[serde(default)]
    pub validation: ValidationOutcomes,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    pub source_url: String,
}

impl Resolution {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            confidence: 0.0,
            methods: Vec::new(),
            validation: ValidationOutcomes::new(),
            errors: Vec::new(),
            source_url: source_url.into(),
        }
    }

    pub fn any_passed(&self) -> bool {
        self.validation
            .values()
            .any(|outcome| *outcome == ValidationOutcome::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_record_serializes_minimal_csl() {
        let record = CitationRecord::bare("1", "https://example.org/page");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "1");
        assert_eq!(json["URL"], "https://example.org/page");
        assert_eq!(json["type"], "webpage");
        assert_eq!(json["resolution"]["confidence"], 0.0);
        assert_eq!(json["resolution"]["source_url"], "https://example.org/page");
        assert!(json.get("DOI").is_none());
        assert!(json["resolution"].get("errors").is_none());
        assert!(json.get("canonical_id").is_none());
        assert!(!record.is_resolved());
    }

    #[test]
    fn resolution_block_keeps_its_fixed_keys() {
        let mut record = CitationRecord::bare("3", "https://example.org/dup");
        record.canonical_id = Some("1".to_string());
        record.resolution.errors.push("boom".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["canonical_id"], "1");

        let mut keys: Vec<&str> = json["resolution"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["confidence", "errors", "methods", "source_url", "validation"]);
    }

    #[test]
    fn csl_field_names_are_renamed() {
        let mut record = CitationRecord::bare("2", "https://doi.org/10.1/x");
        record.doi = Some("10.1/x".to_string());
        record.container_title = Some("Nature".to_string());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["DOI"], "10.1/x");
        assert_eq!(json["container-title"], "Nature");
        assert!(record.has_identifier());
        assert!(record.has_metadata());
    }

    #[test]
    fn validation_outcomes_serialize_lowercase() {
        let mut resolution = Resolution::new("u");
        resolution
            .validation
            .insert("ncbi".to_string(), ValidationOutcome::Skipped);
        let json = serde_json::to_value(&resolution).unwrap();
        assert_eq!(json["validation"]["ncbi"], "skipped");
        assert!(!resolution.any_passed());
    }

    #[test]
    fn identifier_slot_writes_the_right_field() {
        let mut record = CitationRecord::bare("1", "u");
        *record.identifier_slot(IdentifierKind::Pmcid) = Some("PMC1".to_string());
        assert_eq!(record.identifier(IdentifierKind::Pmcid), Some("PMC1"));
        assert!(record.identifier(IdentifierKind::Pmid).is_none());
    }
}
