//! Enricher Set - artifact-to-facts/metrics extraction
//!
//! An [`Enricher`] recognizes one artifact shape (by basename or suffix) and
//! turns a matching artifact into facts and metrics. Enrichers return an
//! empty [`Extraction`] for artifacts they do not recognize and only fail
//! when a recognized artifact is malformed.
//!
//! | Shape                          | Enricher                  |
//! |--------------------------------|---------------------------|
//! | `falba-facts.json`             | [`FactsJsonEnricher`]     |
//! | `ansible.json`                 | [`AnsibleEnricher`]       |
//! | `phoronix.json`                | [`PhoronixEnricher`]      |
//! | `*.log`, `*.log.gz`            | [`TraceLogEnricher`]      |
//! | `sysfs_cpu.tgz`                | [`SysfsCpuEnricher`]      |
//! | `kconfig`                      | [`KconfigEnricher`]       |
//! | `etc_os-release`               | [`OsReleaseEnricher`]     |
//! | `fio_output_*.json`            | [`FioEnricher`]           |
//! | `nixos-version.json`           | [`NixosVersionEnricher`]  |
//! | `nixos-system.txt`             | [`NixosSystemEnricher`]   |
//! | `compile-kernel_elapsed_ns_*`  | [`ElapsedNsEnricher`]     |
//! | `*.tar.gz`                     | [`ArchiveEnricher`]       |
//!
//! ## Example
//!
//! ```rust,no_run
//! use falba::enrich::{Enricher, EnricherSet};
//! use falba::model::Artifact;
//!
//! let enrichers = EnricherSet::standard();
//! let artifact = Artifact::new("results/fio/r1/falba-facts.json")?;
//! for enricher in enrichers.iter() {
//!     let extraction = enricher.enrich(&artifact)?;
//!     println!("{}: {} facts", enricher.name(), extraction.facts.len());
//! }
//! # Ok::<(), falba::Error>(())
//! ```

mod ansible;
mod archive;
mod elapsed;
mod facts_json;
mod fio;
mod kconfig;
mod nixos;
mod os_release;
mod phoronix;
mod sysfs;
mod trace_log;

use std::fmt;

pub use ansible::AnsibleEnricher;
pub use archive::ArchiveEnricher;
pub use elapsed::ElapsedNsEnricher;
pub use facts_json::FactsJsonEnricher;
pub use fio::FioEnricher;
pub use kconfig::KconfigEnricher;
pub use nixos::{NixosSystemEnricher, NixosVersionEnricher};
pub use os_release::OsReleaseEnricher;
pub use phoronix::PhoronixEnricher;
pub use sysfs::SysfsCpuEnricher;
pub use trace_log::{TraceLogEnricher, TraceParser};

use crate::model::{Artifact, Fact, Metric};
use crate::Result;

/// Default nesting budget for archives: contents of a top-level archive are
/// enriched with every enricher except the archive enricher itself.
pub const DEFAULT_ARCHIVE_DEPTH: usize = 1;

/// Facts, metrics and non-fatal diagnostics produced by one enricher or
/// deriver invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Extracted facts.
    pub facts: Vec<Fact>,
    /// Extracted metrics.
    pub metrics: Vec<Metric>,
    /// Warning-level signals to surface to the caller.
    pub warnings: Vec<String>,
}

impl Extraction {
    /// Extraction holding only facts.
    #[must_use]
    pub fn from_facts(facts: Vec<Fact>) -> Self {
        Self {
            facts,
            ..Self::default()
        }
    }

    /// Extraction holding only metrics.
    #[must_use]
    pub fn from_metrics(metrics: Vec<Metric>) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    /// True when nothing (including warnings) was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.metrics.is_empty() && self.warnings.is_empty()
    }

    /// Move everything from `other` onto the end of `self`.
    pub fn append(&mut self, mut other: Self) {
        self.facts.append(&mut other.facts);
        self.metrics.append(&mut other.metrics);
        self.warnings.append(&mut other.warnings);
    }
}

/// Extracts facts and metrics from one artifact shape.
pub trait Enricher: Send + Sync {
    /// Stable name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Extract from `artifact`.
    ///
    /// # Errors
    ///
    /// Only when the artifact matches this enricher's shape but cannot be
    /// read or its content is malformed. Unrecognized artifacts yield
    /// `Ok(Extraction::default())`.
    fn enrich(&self, artifact: &Artifact) -> Result<Extraction>;
}

/// Ordered list of enrichers, applied in registration order.
#[derive(Default)]
pub struct EnricherSet {
    enrichers: Vec<Box<dyn Enricher>>,
}

impl EnricherSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an enricher.
    #[must_use]
    pub fn with(mut self, enricher: impl Enricher + 'static) -> Self {
        self.push(Box::new(enricher));
        self
    }

    /// Append a boxed enricher.
    pub fn push(&mut self, enricher: Box<dyn Enricher>) {
        self.enrichers.push(enricher);
    }

    /// Every built-in enricher, with [`DEFAULT_ARCHIVE_DEPTH`].
    #[must_use]
    pub fn standard() -> Self {
        Self::standard_with_archive_depth(DEFAULT_ARCHIVE_DEPTH)
    }

    /// Every built-in enricher. Archives may nest up to `depth` levels; at
    /// depth 0 no archive enricher is registered.
    #[must_use]
    pub fn standard_with_archive_depth(depth: usize) -> Self {
        let mut set = Self::leaves();
        if depth > 0 {
            let nested = Self::standard_with_archive_depth(depth - 1);
            set.push(Box::new(ArchiveEnricher::new(nested)));
        }
        set
    }

    /// Built-in enrichers that read a single file (everything but archives).
    #[must_use]
    pub fn leaves() -> Self {
        Self::new()
            .with(AnsibleEnricher)
            .with(PhoronixEnricher)
            .with(TraceLogEnricher)
            .with(FactsJsonEnricher)
            .with(SysfsCpuEnricher)
            .with(KconfigEnricher)
            .with(OsReleaseEnricher)
            .with(FioEnricher)
            .with(NixosVersionEnricher)
            .with(NixosSystemEnricher)
            .with(ElapsedNsEnricher)
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Enricher> {
        self.enrichers.iter().map(AsRef::as_ref)
    }

    /// Registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Enricher::name).collect()
    }

    /// Number of registered enrichers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.enrichers.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enrichers.is_empty()
    }
}

impl fmt::Debug for EnricherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// True if the artifact's basename is exactly `name`.
fn basename_is(artifact: &Artifact, name: &str) -> bool {
    artifact.file_name() == Some(name)
}
