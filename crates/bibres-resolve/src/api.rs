use bibres_core::{IdentifierCandidate, IdentifierKind};
use serde::Serialize;

use crate::identifiers::{self, JournalUrlExtractor};

/// Confidence given to an identifier that only passed the syntax check.
pub const SYNTAX_ONLY_CONFIDENCE: f64 = 0.5;

/// Outcome of [`validate_identifier`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierCheck {
    pub valid: bool,
    pub confidence: f64,
    pub kind: IdentifierKind,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized: Option<String>,
}

/// Identifiers found in `url` by pattern matching alone. No network access.
pub fn extract_identifiers_from_url(url: &str) -> Vec<IdentifierCandidate> {
    JournalUrlExtractor::new().extract(url)
}

/// Offline syntax check for one identifier.
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> IdentifierCheck {
    let normalized = identifiers::normalize(kind, value);
    let valid = normalized.is_some();
    IdentifierCheck {
        valid,
        confidence: if valid { SYNTAX_ONLY_CONFIDENCE } else { 0.0 },
        kind,
        value: value.to_string(),
        normalized,
    }
}
