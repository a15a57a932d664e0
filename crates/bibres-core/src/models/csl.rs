use serde::{Deserialize, Serialize};

// ─── Names ──────────────────────────────────────────────────

/// A CSL-JSON name: `{"family": ..., "given": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CslName {
    pub family: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,
}

impl CslName {
    pub fn new(family: impl Into<String>, given: impl Into<String>) -> Self {
        let given = given.into();
        Self {
            family: family.into(),
            given: (!given.trim().is_empty()).then_some(given),
        }
    }

    /// Split a display name into family/given parts.
    ///
    /// `"Family, Given Names"` is split on the comma; otherwise the last
    /// whitespace-separated token is the family name. Blank input yields `None`.
    pub fn from_literal(value: &str) -> Option<Self> {
        let cleaned = value.trim();
        if cleaned.is_empty() {
            return None;
        }

        if let Some((family, given)) = cleaned.split_once(',') {
            let family = family.trim();
            if family.is_empty() {
                return None;
            }
            let given = given.split_whitespace().collect::<Vec<_>>().join(" ");
            return Some(Self::new(family, given));
        }

        let tokens = cleaned.split_whitespace().collect::<Vec<_>>();
        match tokens.split_last() {
            Some((family, [])) => Some(Self::new(*family, "")),
            Some((family, given)) => Some(Self::new(*family, given.join(" "))),
            None => None,
        }
    }
}

// ─── Dates ──────────────────────────────────────────────────

/// A CSL-JSON date: `{"date-parts": [[year, month, day]]}`, truncated to
/// whatever parts are known. `[[2020]]` is a complete, valid value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CslDate {
    #[serde(rename = "date-parts")]
    pub date_parts: Vec<Vec<i32>>,
}

impl CslDate {
    /// Build from optional parts. Without a year there is no date; a day is
    /// only kept when the month is known too.
    pub fn from_parts(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<Self> {
        let year = year?;
        let mut parts = vec![year];
        if let Some(month) = month.filter(|m| (1..=12).contains(m)) {
            parts.push(month as i32);
            if let Some(day) = day.filter(|d| (1..=31).contains(d)) {
                parts.push(day as i32);
            }
        }
        Some(Self {
            date_parts: vec![parts],
        })
    }

    pub fn year(&self) -> Option<i32> {
        self.date_parts.first().and_then(|parts| parts.first()).copied()
    }
}

// ─── Fetched metadata ───────────────────────────────────────

/// Bibliographic metadata as returned by a metadata fetcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BibliographicMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default)]
    pub authors: Vec<CslName>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,

    /// CSL item type, e.g. `article-journal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csl_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmcid: Option<String>,
}
