pub mod resolver;
pub mod stage;

pub use resolver::{BibliographyResolver, ResolvedReference, ResolverBuilder, urls_from_json};
pub use stage::{Stage, StageFailure, StageReport};
