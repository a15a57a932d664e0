//! Ordered bibliography resolution: turns a list of reference URLs into numbered
//! CSL-JSON citation records.

pub mod api;
pub mod assembler;
pub mod dedup;
pub mod error;
pub mod identifiers;
pub mod pipeline;
pub mod sources;
pub mod stats;
pub mod validation;

pub use api::{IdentifierCheck, extract_identifiers_from_url, validate_identifier};
pub use assembler::RecordAssembler;
pub use error::{ResolveError, Result};
pub use pipeline::{BibliographyResolver, ResolverBuilder};
pub use sources::{CandidateSource, MetadataFetcher, Validator};
