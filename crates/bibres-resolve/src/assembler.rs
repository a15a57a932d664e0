use bibres_core::{
    BibliographicMetadata, CitationRecord, CslDate, CslName, IdentifierCandidate, IdentifierKind,
    Reference, ValidationOutcomes, clamp_confidence,
};

use crate::identifiers;

/// Note added when identifiers were found but no metadata came back.
pub const METADATA_NOT_ENRICHED: &str = "metadata enrichment did not occur";

const TYPE_WITH_IDENTIFIER: &str = "article-journal";
const TYPE_WITHOUT_IDENTIFIER: &str = "webpage";

/// Merges everything known about one reference into a CSL-JSON record.
///
/// Pure: the same inputs always give the same record, and absent inputs
/// produce a thinner, lower-confidence record instead of an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAssembler;

impl RecordAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        reference: &Reference,
        candidates: &[IdentifierCandidate],
        metadata: Option<&BibliographicMetadata>,
        validation: &ValidationOutcomes,
    ) -> CitationRecord {
        let mut record = CitationRecord::bare(reference.ref_id(), reference.url());
        let candidates: Vec<&IdentifierCandidate> = candidates
            .iter()
            .filter(|candidate| !candidate.value.trim().is_empty())
            .collect();

        for candidate in &candidates {
            let slot = record.identifier_slot(candidate.kind);
            if slot.is_none() {
                *slot = Some(normalize_or_verbatim(candidate.kind, &candidate.value));
            }
            record.resolution.methods.push(candidate.method.clone());
        }

        record.resolution.confidence = candidates
            .iter()
            .map(|candidate| clamp_confidence(candidate.confidence))
            .fold(0.0, f64::max);

        match metadata {
            Some(metadata) => apply_metadata(&mut record, metadata),
            None if !candidates.is_empty() => {
                record.resolution.errors.push(METADATA_NOT_ENRICHED.to_string());
            }
            None => {}
        }

        if metadata.and_then(|m| clean(m.csl_type.as_deref())).is_none() {
            record.csl_type = if record.has_identifier() {
                TYPE_WITH_IDENTIFIER.to_string()
            } else {
                TYPE_WITHOUT_IDENTIFIER.to_string()
            };
        }

        record.resolution.validation = validation.clone();
        if !candidates.is_empty() && record.resolution.any_passed() {
            record.resolution.confidence = 1.0;
        }

        record.canonical_id = reference.canonical_id().map(ToOwned::to_owned);
        record
    }
}

fn apply_metadata(record: &mut CitationRecord, metadata: &BibliographicMetadata) {
    record.title = clean(metadata.title.as_deref());
    record.author = metadata
        .authors
        .iter()
        .filter_map(|name| {
            let family = name.family.trim();
            if family.is_empty() {
                return None;
            }
            let given = name.given.as_deref().map(str::trim).unwrap_or_default();
            Some(CslName::new(family, given))
        })
        .collect();
    record.issued = CslDate::from_parts(metadata.year, metadata.month, metadata.day);
    record.container_title = clean(metadata.container_title.as_deref());
    record.publisher = clean(metadata.publisher.as_deref());
    record.page = clean(metadata.page.as_deref());
    record.volume = clean(metadata.volume.as_deref());
    record.issue = clean(metadata.issue.as_deref());
    if let Some(csl_type) = clean(metadata.csl_type.as_deref()) {
        record.csl_type = csl_type;
    }

    // Metadata identifiers only fill kinds no candidate supplied.
    let reported = [
        (IdentifierKind::Doi, metadata.doi.as_deref()),
        (IdentifierKind::Pmid, metadata.pmid.as_deref()),
        (IdentifierKind::Pmcid, metadata.pmcid.as_deref()),
    ];
    for (kind, value) in reported {
        let Some(value) = clean(value) else {
            continue;
        };
        let slot = record.identifier_slot(kind);
        if slot.is_none() {
            *slot = Some(normalize_or_verbatim(kind, &value));
        }
    }
}

fn normalize_or_verbatim(kind: IdentifierKind, value: &str) -> String {
    identifiers::normalize(kind, value).unwrap_or_else(|| value.trim().to_string())
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use bibres_core::ValidationOutcome;

    use super::*;

    fn reference() -> Reference {
        Reference::new(1, "https://pubmed.ncbi.nlm.nih.gov/12345/")
    }

    fn outcomes(pairs: &[(&str, ValidationOutcome)]) -> ValidationOutcomes {
        pairs
            .iter()
            .map(|(name, outcome)| (name.to_string(), *outcome))
            .collect()
    }

    #[test]
    fn empty_inputs_give_zero_confidence_record() {
        let record = RecordAssembler::new().assemble(&reference(), &[], None, &ValidationOutcomes::new());
        assert_eq!(record.id, "1");
        assert_eq!(record.url, "https://pubmed.ncbi.nlm.nih.gov/12345/");
        assert_eq!(record.resolution.source_url, record.url);
        assert_eq!(record.resolution.confidence, 0.0);
        assert!(record.resolution.methods.is_empty());
        assert!(record.resolution.errors.is_empty());
        assert_eq!(record.csl_type, "webpage");
        assert!(!record.is_resolved());
    }

    #[test]
    fn every_identifier_kind_is_kept() {
        let candidates = vec![
            IdentifierCandidate::new(IdentifierKind::Doi, "10.1/x", "doi_extraction", 0.6),
            IdentifierCandidate::new(IdentifierKind::Pmid, "123", "pmid_extraction", 0.8),
        ];
        let record =
            RecordAssembler::new().assemble(&reference(), &candidates, None, &ValidationOutcomes::new());
        assert_eq!(record.doi.as_deref(), Some("10.1/x"));
        assert_eq!(record.pmid.as_deref(), Some("123"));
        assert_eq!(record.resolution.confidence, 0.8);
        assert_eq!(record.resolution.methods, vec!["doi_extraction", "pmid_extraction"]);
        assert_eq!(record.resolution.errors, vec![METADATA_NOT_ENRICHED]);
        assert_eq!(record.csl_type, "article-journal");
    }

    #[test]
    fn first_candidate_of_a_kind_fills_the_field() {
        let candidates = vec![
            IdentifierCandidate::new(IdentifierKind::Doi, "10.1/First", "a", 0.3),
            IdentifierCandidate::new(IdentifierKind::Doi, "10.1/second", "b", 0.9),
            IdentifierCandidate::new(IdentifierKind::Doi, "10.1/third", "a", 0.1),
        ];
        let record =
            RecordAssembler::new().assemble(&reference(), &candidates, None, &ValidationOutcomes::new());
        assert_eq!(record.doi.as_deref(), Some("10.1/first"));
        assert_eq!(record.resolution.methods, vec!["a", "b", "a"]);
        assert_eq!(record.resolution.confidence, 0.9);
    }

    #[test]
    fn methods_keep_one_entry_per_candidate() {
        let candidates = vec![
            IdentifierCandidate::new(IdentifierKind::Pmid, "123", "ncbi_idconv", 0.7),
            IdentifierCandidate::new(IdentifierKind::Pmcid, "PMC9", "ncbi_idconv", 0.7),
        ];
        let record =
            RecordAssembler::new().assemble(&reference(), &candidates, None, &ValidationOutcomes::new());
        assert_eq!(record.resolution.methods, vec!["ncbi_idconv", "ncbi_idconv"]);
    }

    #[test]
    fn unparseable_value_is_kept_verbatim() {
        let candidates = vec![IdentifierCandidate::new(
            IdentifierKind::Pmid,
            " not-a-pmid ",
            "scrape",
            0.4,
        )];
        let record =
            RecordAssembler::new().assemble(&reference(), &candidates, None, &ValidationOutcomes::new());
        assert_eq!(record.pmid.as_deref(), Some("not-a-pmid"));
    }

    #[test]
    fn blank_candidate_values_are_ignored() {
        let candidates = vec![IdentifierCandidate::new(IdentifierKind::Doi, "  ", "scrape", 0.7)];
        let record =
            RecordAssembler::new().assemble(&reference(), &candidates, None, &ValidationOutcomes::new());
        assert!(record.doi.is_none());
        assert_eq!(record.resolution.confidence, 0.0);
        assert!(record.resolution.methods.is_empty());
    }

    #[test]
    fn metadata_maps_onto_csl_fields() {
        let candidates = vec![IdentifierCandidate::new(
            IdentifierKind::Pmid,
            "12345",
            "pmid_extraction",
            0.9,
        )];
        let metadata = BibliographicMetadata {
            title: Some("X".to_string()),
            authors: vec![CslName::new("Doe", "Jane"), CslName::new("  ", "Nobody")],
            year: Some(2020),
            day: Some(3),
            container_title: Some("J. Things".to_string()),
            volume: Some(" 7 ".to_string()),
            doi: Some("10.5555/ABC".to_string()),
            pmid: Some("99999".to_string()),
            ..Default::default()
        };
        let record = RecordAssembler::new().assemble(
            &reference(),
            &candidates,
            Some(&metadata),
            &ValidationOutcomes::new(),
        );
        assert_eq!(record.title.as_deref(), Some("X"));
        assert_eq!(record.author, vec![CslName::new("Doe", "Jane")]);
        assert_eq!(record.issued.as_ref().unwrap().date_parts, vec![vec![2020]]);
        assert_eq!(record.container_title.as_deref(), Some("J. Things"));
        assert_eq!(record.volume.as_deref(), Some("7"));
        assert_eq!(record.pmid.as_deref(), Some("12345"), "candidate wins over metadata");
        assert_eq!(record.doi.as_deref(), Some("10.5555/abc"));
        assert!(record.resolution.errors.is_empty());
        assert_eq!(record.resolution.confidence, 0.9);
    }

    #[test]
    fn metadata_type_overrides_default() {
        let candidates = vec![IdentifierCandidate::new(IdentifierKind::Doi, "10.1/x", "d", 0.5)];
        let metadata = BibliographicMetadata {
            csl_type: Some("book".to_string()),
            ..Default::default()
        };
        let record = RecordAssembler::new().assemble(
            &reference(),
            &candidates,
            Some(&metadata),
            &ValidationOutcomes::new(),
        );
        assert_eq!(record.csl_type, "book");
    }

    #[test]
    fn passed_validator_lifts_confidence_to_ceiling() {
        let candidates = vec![IdentifierCandidate::new(IdentifierKind::Pmid, "1", "p", 0.6)];
        let validation = outcomes(&[
            ("ncbi", ValidationOutcome::Passed),
            ("metapub", ValidationOutcome::Failed),
        ]);
        let record = RecordAssembler::new().assemble(&reference(), &candidates, None, &validation);
        assert_eq!(record.resolution.confidence, 1.0);
        assert_eq!(record.resolution.validation, validation);
    }

    #[test]
    fn failed_or_skipped_validation_keeps_extraction_confidence() {
        let candidates = vec![IdentifierCandidate::new(IdentifierKind::Pmid, "1", "p", 0.6)];
        let validation = outcomes(&[
            ("ncbi", ValidationOutcome::Failed),
            ("topic", ValidationOutcome::Skipped),
        ]);
        let record = RecordAssembler::new().assemble(&reference(), &candidates, None, &validation);
        assert_eq!(record.resolution.confidence, 0.6);
    }

    #[test]
    fn passed_validator_without_candidates_stays_zero() {
        let validation = outcomes(&[("ncbi", ValidationOutcome::Passed)]);
        let record = RecordAssembler::new().assemble(&reference(), &[], None, &validation);
        assert_eq!(record.resolution.confidence, 0.0);
    }

    #[test]
    fn canonical_id_is_copied_from_reference() {
        let mut reference = Reference::new(4, "https://doi.org/10.1/x");
        reference.set_canonical_id("2");
        let record = RecordAssembler::new().assemble(&reference, &[], None, &ValidationOutcomes::new());
        assert_eq!(record.id, "4");
        assert_eq!(record.canonical_id.as_deref(), Some("2"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let candidates = vec![
            IdentifierCandidate::new(IdentifierKind::Pmcid, "PMC1", "pmc_extraction", 0.7),
            IdentifierCandidate::new(IdentifierKind::Doi, "10.1/y", "doi_extraction", 0.5),
        ];
        let validation = outcomes(&[("format", ValidationOutcome::Passed)]);
        let assembler = RecordAssembler::new();
        let first = assembler.assemble(&reference(), &candidates, None, &validation);
        let second = assembler.assemble(&reference(), &candidates, None, &validation);
        assert_eq!(first, second);
    }
}
