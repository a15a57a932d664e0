pub mod doi;
pub mod extract;
pub mod pubmed;

pub use doi::Doi;
pub use extract::{JournalUrlExtractor, extract_dois_from_text};
pub use pubmed::{Pmcid, Pmid};

use bibres_core::IdentifierKind;

/// Normalized form of `value` when it parses as `kind`.
pub fn normalize(kind: IdentifierKind, value: &str) -> Option<String> {
    match kind {
        IdentifierKind::Doi => Doi::parse(value).ok().map(|doi| doi.normalized),
        IdentifierKind::Pmid => Pmid::parse(value).ok().map(|pmid| pmid.0),
        IdentifierKind::Pmcid => Pmcid::parse(value).ok().map(|pmcid| pmcid.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_by_kind() {
        assert_eq!(
            normalize(IdentifierKind::Doi, "DOI: 10.1000/ABC").as_deref(),
            Some("10.1000/abc")
        );
        assert_eq!(normalize(IdentifierKind::Pmid, "PMID: 123").as_deref(), Some("123"));
        assert_eq!(normalize(IdentifierKind::Pmcid, "pmc77").as_deref(), Some("PMC77"));
        assert!(normalize(IdentifierKind::Pmid, "abc").is_none());
    }
}
