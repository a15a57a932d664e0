use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid DOI: {0}")]
    InvalidDoi(String),

    #[error("invalid PMID: {0}")]
    InvalidPmid(String),

    #[error("invalid PMCID: {0}")]
    InvalidPmcid(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("{source_name} failed: {message}")]
    Collaborator {
        source_name: String,
        message: String,
    },

    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: String, after: Duration },

    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),

    #[error(transparent)]
    Core(#[from] bibres_core::CoreError),
}

impl ResolveError {
    /// Shorthand for collaborator implementations.
    pub fn collaborator(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
