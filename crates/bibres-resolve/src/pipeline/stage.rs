use std::fmt;
use std::future::Future;
use std::time::Duration;

use bibres_core::FailureReason;
use tracing::warn;

use crate::error::{ResolveError, Result};

/// Steps of the per-reference sequence, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extract,
    Scrape,
    Pdf,
    Fetch,
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Scrape => "scrape",
            Self::Pdf => "pdf",
            Self::Fetch => "fetch",
            Self::Validate => "validate",
        }
    }

    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extract | Self::Scrape | Self::Pdf)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collaborator call that errored or timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    pub source_name: String,
    pub timed_out: bool,
    pub message: String,
}

impl StageFailure {
    fn from_error(stage: Stage, source_name: &str, err: &ResolveError) -> Self {
        Self {
            stage,
            source_name: source_name.to_string(),
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }

    /// Rendered into the record's `errors` list.
    pub fn error_entry(&self) -> String {
        format!("{} ({}): {}", self.stage, self.source_name, self.message)
    }
}

/// Failures collected while one reference moves through the stages.
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    failures: Vec<StageFailure>,
}

impl StageReport {
    pub fn push(&mut self, failure: StageFailure) {
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[StageFailure] {
        &self.failures
    }

    pub fn error_entries(&self) -> Vec<String> {
        self.failures.iter().map(StageFailure::error_entry).collect()
    }

    /// Reason code for a reference that ended up with nothing resolved.
    pub fn failure_reason(&self) -> FailureReason {
        let extraction = self.failures.iter().filter(|f| f.stage.is_extraction());
        let mut any_error = false;
        for failure in extraction {
            if failure.timed_out {
                return FailureReason::ExtractionTimedOut;
            }
            any_error = true;
        }
        if any_error {
            FailureReason::ExtractionFailed
        } else {
            FailureReason::NoIdentifiersFound
        }
    }
}

/// Run one collaborator call under `limit`. An error or an elapsed timer
/// becomes a [`StageFailure`]; the caller carries on with the next stage.
pub async fn call_with_timeout<T, F>(
    stage: Stage,
    source_name: &str,
    limit: Duration,
    call: F,
) -> std::result::Result<T, StageFailure>
where
    F: Future<Output = Result<T>>,
{
    let err = match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => return Ok(value),
        Ok(Err(err)) => err,
        Err(_) => ResolveError::Timeout {
            stage: stage.to_string(),
            after: limit,
        },
    };
    warn!(stage = %stage, source = source_name, error = %err, "collaborator call failed");
    Err(StageFailure::from_error(stage, source_name, &err))
}
