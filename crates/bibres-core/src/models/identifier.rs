use std::fmt;

use serde::{Deserialize, Serialize};

/// The identifier families a bibliography reference can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Doi,
    Pmid,
    Pmcid,
}

impl IdentifierKind {
    pub const ALL: [IdentifierKind; 3] = [Self::Doi, Self::Pmid, Self::Pmcid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Pmid => "pmid",
            Self::Pmcid => "pmcid",
        }
    }

    /// Accepts `doi`, `pmid`, `pmcid` and the common `pmc` alias, case-insensitive.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doi" => Some(Self::Doi),
            "pmid" | "pubmed" => Some(Self::Pmid),
            "pmcid" | "pmc" => Some(Self::Pmcid),
            _ => None,
        }
    }

    /// Lower is tried first when picking an identifier for metadata lookup.
    pub fn fetch_priority(&self) -> u8 {
        match self {
            Self::Pmid => 0,
            Self::Pmcid => 1,
            Self::Doi => 2,
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One identifier proposed by an extraction method, with how sure it is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifierCandidate {
    pub kind: IdentifierKind,
    pub value: String,
    /// Name of the extraction technique, e.g. `pmid_extraction`.
    pub method: String,
    /// In `[0, 1]`.
    pub confidence: f64,
}

impl IdentifierCandidate {
    pub fn new(
        kind: IdentifierKind,
        value: impl Into<String>,
        method: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            method: method.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

/// Clamp into `[0, 1]`; NaN counts as no confidence at all.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
