//! Collaborator seams of the pipeline.
//!
//! Every network-facing step (URL extraction, scraping, PDF extraction,
//! metadata lookup, validation) sits behind one of these traits. The
//! resolver treats any `Err` as a failure of that single step for that
//! single reference.

use async_trait::async_trait;
use bibres_core::{BibliographicMetadata, CitationRecord, IdentifierCandidate, IdentifierKind, ValidationOutcome};

use crate::error::Result;

/// Produces identifier candidates for a URL. Used for the primary
/// extractor as well as the scraping and PDF fallbacks.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn candidates(&self, url: &str) -> Result<Vec<IdentifierCandidate>>;
}

/// Looks up bibliographic metadata for one identifier.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, kind: IdentifierKind, value: &str) -> Result<BibliographicMetadata>;
}

/// Checks a draft record. The draft carries identifiers and metadata but
/// an empty `validation` map.
#[async_trait]
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    async fn validate(&self, record: &CitationRecord) -> Result<ValidationOutcome>;
}
