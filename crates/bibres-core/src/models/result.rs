use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::record::{CitationRecord, ValidationOutcome};

// ─── ResolutionResult ───────────────────────────────────────

/// Output of one resolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub citations: Citations,
    pub stats: ResolutionStats,
    pub failures: Vec<Failure>,
    /// True when the run was cancelled; `citations` then covers only the
    /// references that finished.
    #[serde(default)]
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

// ─── Citations ──────────────────────────────────────────────

/// `ref_id → CitationRecord`, iterated (and serialized) in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Citations {
    records: Vec<CitationRecord>,
}

impl Citations {
    /// Records must already be in input order.
    pub fn from_records(records: Vec<CitationRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, ref_id: &str) -> Option<&CitationRecord> {
        // ref_ids are positions, so an uncancelled run finds them by index.
        let by_position = ref_id
            .parse::<usize>()
            .ok()
            .and_then(|pos| pos.checked_sub(1))
            .and_then(|idx| self.records.get(idx))
            .filter(|record| record.id == ref_id);
        by_position.or_else(|| self.records.iter().find(|record| record.id == ref_id))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CitationRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[CitationRecord] {
        &self.records
    }
}

impl<'a> IntoIterator for &'a Citations {
    type Item = &'a CitationRecord;
    type IntoIter = std::slice::Iter<'a, CitationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Serialize for Citations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.records.len()))?;
        for record in &self.records {
            map.serialize_entry(&record.id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Citations {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CitationsVisitor;

        impl<'de> Visitor<'de> for CitationsVisitor {
            type Value = Citations;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of ref_id to CSL-JSON citation records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Citations, A::Error> {
                let mut records = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, record)) = access.next_entry::<String, CitationRecord>()? {
                    if key != record.id {
                        return Err(serde::de::Error::custom(format!(
                            "citation key {key} does not match record id {}",
                            record.id
                        )));
                    }
                    records.push(record);
                }
                Ok(Citations { records })
            }
        }

        deserializer.deserialize_map(CitationsVisitor)
    }
}

// ─── Failures ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub ref_id: String,
    pub reason: FailureReason,
}

/// Machine-readable reason a reference ended up with nothing resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoIdentifiersFound,
    ExtractionFailed,
    ExtractionTimedOut,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoIdentifiersFound => "no_identifiers_found",
            Self::ExtractionFailed => "extraction_failed",
            Self::ExtractionTimedOut => "extraction_timed_out",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Stats ──────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    /// `resolved / total`, 0 for an empty run.
    pub success_rate: f64,
    pub mean_confidence: f64,
    /// Method name → number of records whose `methods` contain it.
    pub method_counts: BTreeMap<String, usize>,
    pub validators: BTreeMap<String, ValidatorTally>,
    pub identifier_counts: IdentifierCounts,
    pub duplicate_groups: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorTally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ValidatorTally {
    pub fn record(&mut self, outcome: ValidationOutcome) {
        match outcome {
            ValidationOutcome::Passed => self.passed += 1,
            ValidationOutcome::Failed => self.failed += 1,
            ValidationOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: ValidatorTally) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Records carrying each identifier kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierCounts {
    pub doi: usize,
    pub pmid: usize,
    pub pmcid: usize,
}
