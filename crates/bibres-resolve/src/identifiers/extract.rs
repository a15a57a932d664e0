use async_trait::async_trait;
use bibres_core::{IdentifierCandidate, IdentifierKind};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::identifiers::{doi::Doi, pubmed::Pmcid, pubmed::Pmid};
use crate::sources::CandidateSource;

pub const PMID_METHOD: &str = "pmid_extraction";
pub const PMC_METHOD: &str = "pmc_extraction";
pub const DOI_METHOD: &str = "doi_extraction";

static DOI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)10\.\d{4,9}/[-._;()/:A-Z0-9]+[A-Z0-9/]").expect("valid regex"));

static PUBMED_PATH_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:pubmed\.ncbi\.nlm\.nih\.gov/|(?:www\.)?ncbi\.nlm\.nih\.gov/pubmed/)(\d{1,9})(?:[/?#]|$)")
        .expect("valid regex")
});

static EUROPEPMC_MED_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^europepmc\.org/(?:abstract|article)/med/(\d{1,9})(?:[/?#]|$)")
        .expect("valid regex")
});

static PMC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPMC(\d{1,9})\b").expect("valid regex"));

const PMC_HOSTS: &[&str] = &["pmc.ncbi.nlm.nih.gov", "ncbi.nlm.nih.gov", "europepmc.org"];
const DOI_RESOLVER_HOSTS: &[&str] = &["doi.org", "dx.doi.org"];

pub fn extract_dois_from_text(text: &str) -> Vec<Doi> {
    DOI_REGEX
        .find_iter(text)
        .filter_map(|m| Doi::parse(m.as_str()).ok())
        .collect()
}

/// Recognizes identifiers that are spelled out in a URL: PubMed and PMC
/// article pages, doi.org links and publisher URLs carrying a DOI in the
/// path or query. Makes no network calls.
#[derive(Debug, Clone, Default)]
pub struct JournalUrlExtractor;

impl JournalUrlExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, url: &str) -> Vec<IdentifierCandidate> {
        let location = strip_scheme(url.trim());
        let host = host_of(location);
        let mut found: Vec<IdentifierCandidate> = Vec::new();

        let pmid = PUBMED_PATH_REGEX
            .captures(location)
            .or_else(|| EUROPEPMC_MED_REGEX.captures(location))
            .and_then(|caps| caps.get(1))
            .and_then(|m| Pmid::parse(m.as_str()).ok());
        if let Some(pmid) = pmid {
            push_unique(
                &mut found,
                IdentifierCandidate::new(IdentifierKind::Pmid, pmid.0, PMID_METHOD, 0.95),
            );
        }

        if PMC_HOSTS.iter().any(|h| host_matches(host, h)) {
            for caps in PMC_REGEX.captures_iter(location) {
                if let Some(pmcid) = caps.get(1).and_then(|m| Pmcid::parse(m.as_str()).ok()) {
                    push_unique(
                        &mut found,
                        IdentifierCandidate::new(IdentifierKind::Pmcid, pmcid.0, PMC_METHOD, 0.95),
                    );
                }
            }
        }

        let decoded = percent_decode_slashes(location);
        let doi_confidence = if DOI_RESOLVER_HOSTS.iter().any(|h| host_matches(host, h)) {
            0.98
        } else {
            0.9
        };
        for doi in extract_dois_from_text(&decoded) {
            push_unique(
                &mut found,
                IdentifierCandidate::new(IdentifierKind::Doi, doi.normalized, DOI_METHOD, doi_confidence),
            );
        }

        found
    }
}

#[async_trait]
impl CandidateSource for JournalUrlExtractor {
    fn name(&self) -> &str {
        "journal_url"
    }

    async fn candidates(&self, url: &str) -> Result<Vec<IdentifierCandidate>> {
        Ok(self.extract(url))
    }
}

fn push_unique(found: &mut Vec<IdentifierCandidate>, candidate: IdentifierCandidate) {
    let duplicate = found
        .iter()
        .any(|c| c.kind == candidate.kind && c.value == candidate.value);
    if !duplicate {
        found.push(candidate);
    }
}

fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map(|(_, rest)| rest).unwrap_or(url)
}

fn host_of(location: &str) -> &str {
    let end = location.find(['/', '?', '#']).unwrap_or(location.len());
    let host = &location[..end];
    host.rsplit_once('@').map(|(_, h)| h).unwrap_or(host)
}

fn host_matches(host: &str, expected: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host == expected || host.ends_with(&format!(".{expected}"))
}

fn percent_decode_slashes(value: &str) -> String {
    value.replace("%2F", "/").replace("%2f", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_values(found: &[IdentifierCandidate]) -> Vec<(IdentifierKind, &str)> {
        found.iter().map(|c| (c.kind, c.value.as_str())).collect()
    }

    #[test]
    fn test_extract_dois_from_text() {
        let text = "Check out 10.1145/3313831.3376166 and also 10.1038/s41586-021-03819-2.";
        let dois = extract_dois_from_text(text);
        assert_eq!(dois.len(), 2);
        assert_eq!(dois[0].normalized, "10.1145/3313831.3376166");
        assert_eq!(dois[1].normalized, "10.1038/s41586-021-03819-2");
    }

    #[test]
    fn pubmed_url_yields_pmid() {
        let found = JournalUrlExtractor::new().extract("https://pubmed.ncbi.nlm.nih.gov/37674083/");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Pmid, "37674083")]);
        assert_eq!(found[0].method, PMID_METHOD);
        assert_eq!(found[0].confidence, 0.95);
    }

    #[test]
    fn legacy_pubmed_and_europepmc_urls() {
        let extractor = JournalUrlExtractor::new();
        let found = extractor.extract("https://www.ncbi.nlm.nih.gov/pubmed/12345");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Pmid, "12345")]);
        let found = extractor.extract("https://europepmc.org/article/MED/998877");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Pmid, "998877")]);
    }

    #[test]
    fn pmc_url_yields_pmcid() {
        let found =
            JournalUrlExtractor::new().extract("https://pmc.ncbi.nlm.nih.gov/articles/PMC11239014/");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Pmcid, "PMC11239014")]);
        assert_eq!(found[0].method, PMC_METHOD);
    }

    #[test]
    fn pmc_pattern_ignored_on_other_hosts() {
        let found = JournalUrlExtractor::new().extract("https://example.com/files/PMC123.html");
        assert!(found.is_empty());
    }

    #[test]
    fn publisher_url_yields_doi() {
        let found =
            JournalUrlExtractor::new().extract("https://www.science.org/doi/10.1126/science.abm5224");
        assert_eq!(
            kinds_and_values(&found),
            vec![(IdentifierKind::Doi, "10.1126/science.abm5224")]
        );
        assert_eq!(found[0].confidence, 0.9);
    }

    #[test]
    fn doi_resolver_url_has_higher_confidence() {
        let found = JournalUrlExtractor::new().extract("https://doi.org/10.1038/nature14539");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Doi, "10.1038/nature14539")]);
        assert_eq!(found[0].confidence, 0.98);
    }

    #[test]
    fn percent_encoded_doi_in_query() {
        let found = JournalUrlExtractor::new()
            .extract("https://example.org/lookup?doi=10.1002%2Fglia.24000&ref=x");
        assert_eq!(kinds_and_values(&found), vec![(IdentifierKind::Doi, "10.1002/glia.24000")]);
    }

    #[test]
    fn url_without_identifiers() {
        let found =
            JournalUrlExtractor::new().extract("https://academic.oup.com/brain/article/145/1/64/6367770");
        assert!(found.is_empty());
        assert!(JournalUrlExtractor::new().extract("").is_empty());
    }

    #[tokio::test]
    async fn candidate_source_delegates_to_extract() {
        let extractor = JournalUrlExtractor::new();
        let found = extractor
            .candidates("https://pubmed.ncbi.nlm.nih.gov/1/")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(extractor.name(), "journal_url");
    }
}
