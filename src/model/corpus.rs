//! Corpus - the full collection of runs under analysis
//!
//! On-disk layout consumed by [`Corpus::read_dir`]:
//!
//! ```text
//! <root>/
//!   <test_name>/
//!     <run_id>/
//!       falba-facts.json
//!       bpftrace.log.gz
//!       ...
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use super::{FactValue, Run, RunKey};
use crate::{Error, Result};

/// All runs, keyed by `(test group, run id)`.
#[derive(Debug, Default, Clone)]
pub struct Corpus {
    runs: BTreeMap<RunKey, Run>,
}

/// One metric with its run's facts denormalized alongside it.
///
/// This is the export boundary for tabular consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    /// Run identifier.
    pub run_id: String,
    /// Test group name.
    pub test_name: String,
    /// Metric name.
    pub metric: String,
    /// Metric value.
    pub value: FactValue,
    /// Metric unit, if any.
    pub unit: Option<String>,
    /// The run's fact values.
    pub facts: BTreeMap<String, FactValue>,
}

impl Corpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover `root/<test_name>/<run_id>/` directories.
    ///
    /// Non-directory entries at the test-group and run levels are ignored.
    ///
    /// # Errors
    ///
    /// Any unreadable directory is structural and aborts discovery with
    /// [`Error::Corpus`].
    pub fn read_dir(root: &Path) -> Result<Self> {
        let mut corpus = Self::new();

        for test_dir in list_subdirs(root)? {
            let test_name = test_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            for run_dir in list_subdirs(&test_dir)? {
                corpus.insert(Run::read_dir(&run_dir, test_name.clone())?);
            }
        }

        tracing::info!(root = %root.display(), runs = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    /// Insert a run, replacing (with a warning) one with the same key.
    pub fn insert(&mut self, run: Run) -> Option<Run> {
        let key = run.key().clone();
        let previous = self.runs.insert(key.clone(), run);
        if previous.is_some() {
            tracing::warn!(run = %key, "replaced run with identical test name and run id");
        }
        previous
    }

    /// Number of runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True if no runs were discovered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Look up a run.
    #[must_use]
    pub fn get(&self, key: &RunKey) -> Option<&Run> {
        self.runs.get(key)
    }

    /// Runs in key order.
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.runs.values()
    }

    /// Mutable runs in key order.
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.runs.values_mut()
    }

    #[cfg(feature = "parallel")]
    pub(crate) fn runs_map_mut(&mut self) -> &mut BTreeMap<RunKey, Run> {
        &mut self.runs
    }

    /// One [`FlatRecord`] per metric across the corpus.
    #[must_use]
    pub fn flat_records(&self) -> Vec<FlatRecord> {
        let mut records = Vec::new();
        for run in self.runs() {
            let facts = run.fact_values();
            for metric in run.metrics() {
                records.push(FlatRecord {
                    run_id: run.run_id().to_string(),
                    test_name: run.test_name().to_string(),
                    metric: metric.name().to_string(),
                    value: metric.value().clone(),
                    unit: metric.unit().map(str::to_string),
                    facts: facts.clone(),
                });
            }
        }
        records
    }
}

impl FromIterator<Run> for Corpus {
    fn from_iter<I: IntoIterator<Item = Run>>(iter: I) -> Self {
        let mut corpus = Self::new();
        for run in iter {
            corpus.insert(run);
        }
        corpus
    }
}

fn list_subdirs(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let corpus_err = |source| Error::Corpus {
        path: dir.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(corpus_err)? {
        let entry = entry.map_err(corpus_err)?;
        if entry.file_type().map_err(corpus_err)?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
