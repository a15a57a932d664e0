use std::collections::{BTreeMap, BTreeSet};

use bibres_core::{CitationRecord, IdentifierCounts, ResolutionStats, ValidatorTally};

/// Order-independent accumulator behind [`ResolutionStats`].
///
/// `observe` and `merge` only add counters, so any fold order (or a
/// parallel fold merged afterwards) yields the same stats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsAccumulator {
    total: usize,
    resolved: usize,
    confidence_sum: f64,
    method_counts: BTreeMap<String, usize>,
    validators: BTreeMap<String, ValidatorTally>,
    identifier_counts: IdentifierCounts,
}

impl StatsAccumulator {
    pub fn observe(mut self, record: &CitationRecord) -> Self {
        self.total += 1;
        if record.is_resolved() {
            self.resolved += 1;
        }
        self.confidence_sum += record.resolution.confidence;

        let methods: BTreeSet<&str> = record.resolution.methods.iter().map(String::as_str).collect();
        for method in methods {
            *self.method_counts.entry(method.to_string()).or_default() += 1;
        }

        for (name, outcome) in &record.resolution.validation {
            self.validators.entry(name.clone()).or_default().record(*outcome);
        }

        if record.doi.is_some() {
            self.identifier_counts.doi += 1;
        }
        if record.pmid.is_some() {
            self.identifier_counts.pmid += 1;
        }
        if record.pmcid.is_some() {
            self.identifier_counts.pmcid += 1;
        }
        self
    }

    pub fn merge(mut self, other: StatsAccumulator) -> Self {
        self.total += other.total;
        self.resolved += other.resolved;
        self.confidence_sum += other.confidence_sum;
        for (method, count) in other.method_counts {
            *self.method_counts.entry(method).or_default() += count;
        }
        for (name, tally) in other.validators {
            self.validators.entry(name).or_default().merge(tally);
        }
        self.identifier_counts.doi += other.identifier_counts.doi;
        self.identifier_counts.pmid += other.identifier_counts.pmid;
        self.identifier_counts.pmcid += other.identifier_counts.pmcid;
        self
    }

    pub fn finish(self, duplicate_groups: usize) -> ResolutionStats {
        let (success_rate, mean_confidence) = if self.total == 0 {
            (0.0, 0.0)
        } else {
            let total = self.total as f64;
            (self.resolved as f64 / total, self.confidence_sum / total)
        };

        ResolutionStats {
            total: self.total,
            resolved: self.resolved,
            unresolved: self.total - self.resolved,
            success_rate,
            mean_confidence,
            method_counts: self.method_counts,
            validators: self.validators,
            identifier_counts: self.identifier_counts,
            duplicate_groups,
        }
    }
}

pub fn compute_stats<'a, I>(records: I, duplicate_groups: usize) -> ResolutionStats
where
    I: IntoIterator<Item = &'a CitationRecord>,
{
    records
        .into_iter()
        .fold(StatsAccumulator::default(), StatsAccumulator::observe)
        .finish(duplicate_groups)
}
