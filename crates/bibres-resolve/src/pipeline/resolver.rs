use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bibres_core::{
    BibliographicMetadata, CitationRecord, Citations, Failure, FailureReason, IdentifierCandidate,
    IdentifierKind, PipelineConfig, Reference, ResolutionResult, ResolveOptions, ResolverConfig,
    ValidationOutcome, ValidationOutcomes, number_references,
};
use chrono::Utc;
use futures::StreamExt;
use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assembler::RecordAssembler;
use crate::dedup::DuplicateFinder;
use crate::error::{ResolveError, Result};
use crate::identifiers::{self, JournalUrlExtractor};
use crate::pipeline::stage::{Stage, StageReport, call_with_timeout};
use crate::sources::{CandidateSource, MetadataFetcher, Validator};
use crate::stats::compute_stats;
use crate::validation::builtin_validator;

/// One reference after it went through every stage.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub reference: Reference,
    pub record: CitationRecord,
    /// Set when the record ended up with no identifier and no metadata.
    pub failure: Option<FailureReason>,
}

/// Drives the per-reference pipeline over an ordered URL list.
///
/// References run concurrently, bounded by `PipelineConfig::concurrency`.
/// Each one writes only its own slot; citations, failures and stats are
/// built after every slot is filled, in input order.
#[derive(Clone)]
pub struct BibliographyResolver {
    extractor: Arc<dyn CandidateSource>,
    scraper: Option<Arc<dyn CandidateSource>>,
    pdf_extractor: Option<Arc<dyn CandidateSource>>,
    fetcher: Option<Arc<dyn MetadataFetcher>>,
    validators: Vec<Arc<dyn Validator>>,
    topic_validator: Option<Arc<dyn Validator>>,
    assembler: RecordAssembler,
    duplicate_finder: DuplicateFinder,
    pipeline: PipelineConfig,
}

pub struct ResolverBuilder {
    extractor: Arc<dyn CandidateSource>,
    scraper: Option<Arc<dyn CandidateSource>>,
    pdf_extractor: Option<Arc<dyn CandidateSource>>,
    fetcher: Option<Arc<dyn MetadataFetcher>>,
    validators: Vec<Arc<dyn Validator>>,
    topic_validator: Option<Arc<dyn Validator>>,
    pipeline: PipelineConfig,
}

impl ResolverBuilder {
    pub fn with_scraper(mut self, scraper: Arc<dyn CandidateSource>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    pub fn with_pdf_extractor(mut self, pdf_extractor: Arc<dyn CandidateSource>) -> Self {
        self.pdf_extractor = Some(pdf_extractor);
        self
    }

    pub fn with_metadata_fetcher(mut self, fetcher: Arc<dyn MetadataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_topic_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.topic_validator = Some(validator);
        self
    }

    pub fn with_pipeline_config(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.pipeline.call_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn build(self) -> BibliographyResolver {
        BibliographyResolver {
            extractor: self.extractor,
            scraper: self.scraper,
            pdf_extractor: self.pdf_extractor,
            fetcher: self.fetcher,
            validators: self.validators,
            topic_validator: self.topic_validator,
            assembler: RecordAssembler::new(),
            duplicate_finder: DuplicateFinder::new(),
            pipeline: self.pipeline,
        }
    }
}

impl BibliographyResolver {
    pub fn builder(extractor: Arc<dyn CandidateSource>) -> ResolverBuilder {
        ResolverBuilder {
            extractor,
            scraper: None,
            pdf_extractor: None,
            fetcher: None,
            validators: Vec::new(),
            topic_validator: None,
            pipeline: PipelineConfig::default(),
        }
    }

    /// Offline resolver: URL pattern extraction plus the built-in validators
    /// named in the config.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut builder = Self::builder(Arc::new(JournalUrlExtractor::new()))
            .with_pipeline_config(config.pipeline.clone());
        for name in &config.validators.enabled {
            builder = builder.with_validator(Arc::from(builtin_validator(name)?));
        }
        Ok(builder.build())
    }

    /// Names recorded in every record's `validation` map.
    pub fn validator_names(&self) -> Vec<&str> {
        self.validators
            .iter()
            .chain(self.topic_validator.iter())
            .map(|validator| validator.name())
            .collect()
    }

    /// Options switched on in `options` that have no collaborator to run.
    pub fn unsupported_options(&self, options: &ResolveOptions) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if options.scrape && self.scraper.is_none() {
            missing.push("scrape");
        }
        if options.pdf && self.pdf_extractor.is_none() {
            missing.push("pdf");
        }
        if options.validate && options.topic_validation && self.topic_validator.is_none() {
            missing.push("topic_validation");
        }
        missing
    }

    pub async fn resolve<S: AsRef<str>>(&self, urls: &[S], options: &ResolveOptions) -> ResolutionResult {
        self.resolve_with_cancel(urls, options, CancellationToken::new())
            .await
    }

    /// Entry point for untyped input. Anything but an array of strings is
    /// rejected before a single reference is touched.
    pub async fn resolve_value(&self, input: &Value, options: &ResolveOptions) -> Result<ResolutionResult> {
        let urls = urls_from_json(input)?;
        Ok(self.resolve(&urls, options).await)
    }

    /// Like [`resolve`](Self::resolve), stopping early once `cancel` fires.
    /// References still in flight at that point are dropped whole.
    pub async fn resolve_with_cancel<S: AsRef<str>>(
        &self,
        urls: &[S],
        options: &ResolveOptions,
        cancel: CancellationToken,
    ) -> ResolutionResult {
        let references = number_references(urls);
        let total = references.len();
        let options = *options;
        info!(total, ?options, "resolving bibliography");
        let unsupported = self.unsupported_options(&options);
        if !unsupported.is_empty() {
            warn!(
                options = ?unsupported,
                "options enabled without a collaborator to run them; ignoring"
            );
        }

        let mut slots: Vec<Option<ResolvedReference>> = (0..total).map(|_| None).collect();
        let mut stream = futures::stream::iter(references.into_iter().enumerate())
            .map(|(idx, reference)| {
                let cancel = cancel.clone();
                async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => (idx, None),
                        resolved = self.resolve_reference(reference, &options) => (idx, Some(resolved)),
                    }
                }
            })
            .buffer_unordered(self.pipeline.concurrency.max(1));

        while let Some((idx, resolved)) = stream.next().await {
            slots[idx] = resolved;
        }
        drop(stream);

        let mut resolved: Vec<ResolvedReference> = slots.into_iter().flatten().collect();
        let cancelled = resolved.len() < total;
        if cancelled {
            info!(completed = resolved.len(), total, "resolution cancelled");
        }

        let duplicate_groups = if options.dedupe {
            self.mark_duplicates(&mut resolved)
        } else {
            0
        };

        let mut failures = Vec::new();
        let mut records = Vec::with_capacity(resolved.len());
        for item in resolved {
            if let Some(reason) = item.failure {
                failures.push(Failure {
                    ref_id: item.record.id.clone(),
                    reason,
                });
            }
            records.push(item.record);
        }

        let stats = compute_stats(&records, duplicate_groups);
        info!(
            total = stats.total,
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            "bibliography resolved"
        );

        ResolutionResult {
            citations: Citations::from_records(records),
            stats,
            failures,
            cancelled,
            generated_at: Utc::now(),
        }
    }

    /// extract → (scrape) → (pdf) → (fetch) → (validate) → assemble, for one
    /// reference. Always ends with an assembled record.
    pub async fn resolve_reference(&self, reference: Reference, options: &ResolveOptions) -> ResolvedReference {
        let mut report = StageReport::default();
        let url = reference.url().to_string();

        let mut candidates = self
            .collect_candidates(Stage::Extract, self.extractor.as_ref(), &url, &mut report)
            .await;

        if let Some(scraper) = self.scraper.as_ref().filter(|_| options.scrape) {
            if candidates.is_empty() {
                let found = self
                    .collect_candidates(Stage::Scrape, scraper.as_ref(), &url, &mut report)
                    .await;
                candidates.extend(found);
            }
        }

        if let Some(pdf) = self.pdf_extractor.as_ref().filter(|_| options.pdf) {
            if candidates.is_empty() {
                let found = self
                    .collect_candidates(Stage::Pdf, pdf.as_ref(), &url, &mut report)
                    .await;
                candidates.extend(found);
            }
        }

        let metadata = self.fetch_metadata(&candidates, &mut report).await;
        let validation = self
            .run_validators(&reference, &candidates, metadata.as_ref(), options, &mut report)
            .await;

        let mut record =
            self.assembler
                .assemble(&reference, &candidates, metadata.as_ref(), &validation);
        if !report.failures().is_empty() {
            let mut errors = report.error_entries();
            errors.append(&mut record.resolution.errors);
            record.resolution.errors = errors;
        }

        let failure = (!record.is_resolved()).then(|| report.failure_reason());
        debug!(
            ref_id = reference.ref_id(),
            candidates = candidates.len(),
            confidence = record.resolution.confidence,
            failed = failure.is_some(),
            "reference assembled"
        );

        ResolvedReference {
            reference,
            record,
            failure,
        }
    }

    async fn collect_candidates(
        &self,
        stage: Stage,
        source: &dyn CandidateSource,
        url: &str,
        report: &mut StageReport,
    ) -> Vec<IdentifierCandidate> {
        match call_with_timeout(stage, source.name(), self.call_timeout(), source.candidates(url)).await {
            Ok(mut found) => {
                for candidate in &mut found {
                    if candidate.method.trim().is_empty() {
                        candidate.method = source.name().to_string();
                    }
                }
                debug!(stage = %stage, source = source.name(), found = found.len(), "candidates collected");
                found
            }
            Err(failure) => {
                report.push(failure);
                Vec::new()
            }
        }
    }

    /// PMID first, then PMCID, then (when allowed) DOI.
    async fn fetch_metadata(
        &self,
        candidates: &[IdentifierCandidate],
        report: &mut StageReport,
    ) -> Option<BibliographicMetadata> {
        let fetcher = self.fetcher.as_ref()?;
        let chosen = candidates
            .iter()
            .filter(|c| !c.value.trim().is_empty())
            .filter(|c| self.pipeline.doi_metadata_fallback || c.kind != IdentifierKind::Doi)
            .min_by_key(|c| c.kind.fetch_priority())?;

        let value = identifiers::normalize(chosen.kind, &chosen.value)
            .unwrap_or_else(|| chosen.value.trim().to_string());
        debug!(kind = %chosen.kind, value = %value, source = fetcher.name(), "fetching metadata");

        match call_with_timeout(Stage::Fetch, fetcher.name(), self.call_timeout(), fetcher.fetch(chosen.kind, &value)).await {
            Ok(metadata) => Some(metadata),
            Err(failure) => {
                report.push(failure);
                None
            }
        }
    }

    async fn run_validators(
        &self,
        reference: &Reference,
        candidates: &[IdentifierCandidate],
        metadata: Option<&BibliographicMetadata>,
        options: &ResolveOptions,
        report: &mut StageReport,
    ) -> ValidationOutcomes {
        let mut outcomes = ValidationOutcomes::new();
        let run_topic = options.validate && options.topic_validation;

        let mut active: Vec<&Arc<dyn Validator>> = Vec::new();
        for validator in &self.validators {
            if options.validate {
                active.push(validator);
            } else {
                outcomes.insert(validator.name().to_string(), ValidationOutcome::Skipped);
            }
        }
        if let Some(topic) = &self.topic_validator {
            if run_topic {
                active.push(topic);
            } else {
                outcomes.insert(topic.name().to_string(), ValidationOutcome::Skipped);
            }
        }
        if active.is_empty() {
            return outcomes;
        }

        let draft = self
            .assembler
            .assemble(reference, candidates, metadata, &ValidationOutcomes::new());
        let limit = self.call_timeout();
        let results = join_all(active.iter().map(|validator| {
            call_with_timeout(Stage::Validate, validator.name(), limit, validator.validate(&draft))
        }))
        .await;

        for (validator, result) in active.iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(failure) => {
                    report.push(failure);
                    ValidationOutcome::Failed
                }
            };
            outcomes.insert(validator.name().to_string(), outcome);
        }
        outcomes
    }

    fn mark_duplicates(&self, resolved: &mut [ResolvedReference]) -> usize {
        let records: Vec<CitationRecord> = resolved.iter().map(|item| item.record.clone()).collect();
        let groups = self.duplicate_finder.find_groups(&records);

        let positions: HashMap<String, usize> = resolved
            .iter()
            .enumerate()
            .map(|(idx, item)| (item.record.id.clone(), idx))
            .collect();
        for group in &groups {
            for duplicate in &group.duplicates {
                if let Some(idx) = positions.get(duplicate) {
                    let item = &mut resolved[*idx];
                    item.reference.set_canonical_id(group.canonical.clone());
                    item.record.canonical_id = Some(group.canonical.clone());
                }
            }
        }
        debug!(groups = groups.len(), "duplicate references grouped");
        groups.len()
    }

    fn call_timeout(&self) -> Duration {
        self.pipeline.call_timeout()
    }
}

/// Accept a JSON array of strings, nothing else.
pub fn urls_from_json(input: &Value) -> Result<Vec<String>> {
    let items = input.as_array().ok_or_else(|| {
        ResolveError::MalformedInput("expected a JSON array of URL strings".to_string())
    })?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            item.as_str().map(ToOwned::to_owned).ok_or_else(|| {
                ResolveError::MalformedInput(format!(
                    "entry {} is not a string: {item}",
                    idx + 1
                ))
            })
        })
        .collect()
}
