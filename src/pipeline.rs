//! Pipeline Driver
//!
//! Applies an [`EnricherSet`] and then a [`DeriverSet`] to every run of a
//! [`Corpus`]. Both phases tolerate partial failure: an enricher error
//! aborts only the artifact it was processing, a deriver error only that
//! deriver's output for one run. Failures are collected into a
//! [`PhaseReport`] for the caller to surface once the phase completes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use falba::model::Corpus;
//! use falba::pipeline::Pipeline;
//!
//! let mut corpus = Corpus::read_dir(Path::new("results"))?;
//! let pipeline = Pipeline::builder().archive_depth(2).build();
//!
//! let enriched = pipeline.enrich(&mut corpus);
//! let derived = pipeline.derive(&mut corpus);
//! enriched.log("enrich");
//! derived.log("derive");
//! # Ok::<(), falba::Error>(())
//! ```

use std::fmt;

use crate::derive::DeriverSet;
use crate::enrich::{EnricherSet, Extraction, DEFAULT_ARCHIVE_DEPTH};
use crate::model::{Artifact, Corpus, Run, RunKey};
use crate::Error;

/// Non-fatal signal raised while merging extractor output into a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A fact name was already present; the new value was discarded.
    DuplicateFact {
        /// Run the fact was destined for
        run: RunKey,
        /// Colliding fact name
        fact: String,
        /// Enricher or deriver that produced the duplicate
        source: &'static str,
    },
    /// Warning reported by an enricher or deriver (e.g. an empty trace log).
    Extractor {
        /// Run being processed
        run: RunKey,
        /// Enricher or deriver that raised it
        source: &'static str,
        /// Message
        message: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFact { run, fact, source } => {
                write!(f, "{run}: {source} produced duplicate fact '{fact}', discarded")
            }
            Self::Extractor {
                run,
                source,
                message,
            } => write!(f, "{run}: {source}: {message}"),
        }
    }
}

/// Errors and warnings accumulated by one pipeline phase.
#[derive(Debug, Default)]
pub struct PhaseReport {
    /// Enricher/deriver failures, each scoped to one artifact or run
    pub errors: Vec<Error>,
    /// Duplicate facts and extractor warnings
    pub warnings: Vec<Warning>,
}

impl PhaseReport {
    /// True when the phase produced neither errors nor warnings.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Append everything from `other`.
    pub fn extend(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Emit every error and warning on the diagnostics channel.
    pub fn log(&self, phase: &str) {
        for error in &self.errors {
            tracing::error!(phase, "{error}");
        }
        for warning in &self.warnings {
            tracing::warn!(phase, "{warning}");
        }
        tracing::info!(
            phase,
            errors = self.errors.len(),
            warnings = self.warnings.len(),
            "phase complete"
        );
    }
}

impl FromIterator<Self> for PhaseReport {
    fn from_iter<I: IntoIterator<Item = Self>>(iter: I) -> Self {
        let mut report = Self::default();
        for other in iter {
            report.extend(other);
        }
        report
    }
}

/// Merge `extraction` into `run`. Duplicate facts become warnings.
fn merge(run: &mut Run, source: &'static str, extraction: Extraction, report: &mut PhaseReport) {
    for fact in extraction.facts {
        let name = fact.name().to_string();
        if run.add_fact(fact).is_err() {
            tracing::warn!(run = %run.key(), fact = %name, source, "duplicate fact discarded");
            report.warnings.push(Warning::DuplicateFact {
                run: run.key().clone(),
                fact: name,
                source,
            });
        }
    }
    for metric in extraction.metrics {
        run.add_metric(metric);
    }
    for message in extraction.warnings {
        report.warnings.push(Warning::Extractor {
            run: run.key().clone(),
            source,
            message,
        });
    }
}

/// Run every enricher over every artifact of one run.
fn enrich_run(run: &mut Run, enrichers: &EnricherSet) -> PhaseReport {
    let mut report = PhaseReport::default();
    let artifacts: Vec<Artifact> = run.artifacts().values().cloned().collect();

    for artifact in &artifacts {
        for enricher in enrichers.iter() {
            match enricher.enrich(artifact) {
                Ok(extraction) => merge(run, enricher.name(), extraction, &mut report),
                Err(source) => {
                    tracing::debug!(
                        run = %run.key(),
                        enricher = enricher.name(),
                        path = %artifact.path().display(),
                        "enricher failed, skipping rest of artifact"
                    );
                    report.errors.push(Error::Enrichment {
                        enricher: enricher.name(),
                        path: artifact.path().to_path_buf(),
                        source: Box::new(source),
                    });
                    break;
                }
            }
        }
    }
    report
}

/// Run every deriver over one run, merging each before the next runs.
fn derive_run(run: &mut Run, derivers: &DeriverSet) -> PhaseReport {
    let mut report = PhaseReport::default();
    for deriver in derivers.iter() {
        match deriver.derive(run) {
            Ok(extraction) => merge(run, deriver.name(), extraction, &mut report),
            Err(source) => report.errors.push(Error::Derivation {
                deriver: deriver.name(),
                run: run.key().to_string(),
                source: Box::new(source),
            }),
        }
    }
    report
}

/// Apply `enrichers` to every artifact of every run.
pub fn apply_enrichers(corpus: &mut Corpus, enrichers: &EnricherSet) -> PhaseReport {
    corpus
        .runs_mut()
        .map(|run| enrich_run(run, enrichers))
        .collect()
}

/// Apply `derivers` to every run, in registration order.
pub fn apply_derivers(corpus: &mut Corpus, derivers: &DeriverSet) -> PhaseReport {
    corpus
        .runs_mut()
        .map(|run| derive_run(run, derivers))
        .collect()
}

/// [`apply_enrichers`] with runs processed on the rayon pool.
///
/// Each run is mutated only by the task that owns it; per-run reports are
/// merged in corpus key order.
#[cfg(feature = "parallel")]
pub fn apply_enrichers_parallel(corpus: &mut Corpus, enrichers: &EnricherSet) -> PhaseReport {
    use rayon::prelude::*;

    let reports: Vec<PhaseReport> = corpus
        .runs_map_mut()
        .par_iter_mut()
        .map(|(_, run)| enrich_run(run, enrichers))
        .collect();
    reports.into_iter().collect()
}

/// [`apply_derivers`] with runs processed on the rayon pool.
#[cfg(feature = "parallel")]
pub fn apply_derivers_parallel(corpus: &mut Corpus, derivers: &DeriverSet) -> PhaseReport {
    use rayon::prelude::*;

    let reports: Vec<PhaseReport> = corpus
        .runs_map_mut()
        .par_iter_mut()
        .map(|(_, run)| derive_run(run, derivers))
        .collect();
    reports.into_iter().collect()
}

/// Configured enricher and deriver sets.
#[derive(Debug)]
pub struct Pipeline {
    enrichers: EnricherSet,
    derivers: DeriverSet,
    parallel: bool,
}

impl Pipeline {
    /// Create a new pipeline builder
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Registered enrichers.
    #[must_use]
    pub const fn enrichers(&self) -> &EnricherSet {
        &self.enrichers
    }

    /// Registered derivers.
    #[must_use]
    pub const fn derivers(&self) -> &DeriverSet {
        &self.derivers
    }

    /// True if runs are processed on the rayon pool.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "parallel")
    }

    /// Run the enrichment phase over `corpus`.
    pub fn enrich(&self, corpus: &mut Corpus) -> PhaseReport {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return apply_enrichers_parallel(corpus, &self.enrichers);
            }
        }
        apply_enrichers(corpus, &self.enrichers)
    }

    /// Run the derivation phase over `corpus`.
    pub fn derive(&self, corpus: &mut Corpus) -> PhaseReport {
        #[cfg(feature = "parallel")]
        {
            if self.parallel {
                return apply_derivers_parallel(corpus, &self.derivers);
            }
        }
        apply_derivers(corpus, &self.derivers)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Pipeline builder
#[derive(Debug)]
pub struct PipelineBuilder {
    archive_depth: usize,
    parallel: bool,
    enrichers: Option<EnricherSet>,
    derivers: Option<DeriverSet>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self {
            archive_depth: DEFAULT_ARCHIVE_DEPTH,
            parallel: cfg!(feature = "parallel"),
            enrichers: None,
            derivers: None,
        }
    }
}

impl PipelineBuilder {
    /// How many levels of nested archives are enriched (0 disables archive
    /// handling). Ignored when [`enrichers`](Self::enrichers) is set.
    #[must_use]
    pub fn archive_depth(mut self, depth: usize) -> Self {
        self.archive_depth = depth;
        self
    }

    /// Process runs in parallel. Only effective with the `parallel` feature.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Replace the standard enricher set
    #[must_use]
    pub fn enrichers(mut self, enrichers: EnricherSet) -> Self {
        self.enrichers = Some(enrichers);
        self
    }

    /// Replace the standard deriver set
    #[must_use]
    pub fn derivers(mut self, derivers: DeriverSet) -> Self {
        self.derivers = Some(derivers);
        self
    }

    /// Build the pipeline
    #[must_use]
    pub fn build(self) -> Pipeline {
        if self.parallel && !cfg!(feature = "parallel") {
            tracing::debug!("built without the parallel feature, running sequentially");
        }
        Pipeline {
            enrichers: self
                .enrichers
                .unwrap_or_else(|| EnricherSet::standard_with_archive_depth(self.archive_depth)),
            derivers: self.derivers.unwrap_or_else(DeriverSet::standard),
            parallel: self.parallel,
        }
    }
}
