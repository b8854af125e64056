//! Run - one benchmark execution and its collected attributes

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{Artifact, Fact, FactValue, Metric};
use crate::{Error, Result};

/// Identity of a run within a corpus: the `(test group, run id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunKey {
    /// Test group the run was discovered under.
    pub test_name: String,
    /// Run identifier (directory name).
    pub run_id: String,
}

impl RunKey {
    /// Create a key.
    #[must_use]
    pub fn new(test_name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            test_name: test_name.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.test_name, self.run_id)
    }
}

/// A single run: its artifacts, facts and metrics.
///
/// Attributes are append-only. Facts are keyed by name and unique; metrics
/// are an ordered sequence that may repeat names.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    key: RunKey,
    artifacts: BTreeMap<PathBuf, Artifact>,
    facts: BTreeMap<String, Fact>,
    metrics: Vec<Metric>,
}

impl Run {
    /// Create an empty run.
    #[must_use]
    pub fn new(test_name: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            key: RunKey::new(test_name, run_id),
            artifacts: BTreeMap::new(),
            facts: BTreeMap::new(),
            metrics: Vec::new(),
        }
    }

    /// Build a run from a run directory; its regular files become artifacts.
    ///
    /// The run id is the directory's name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corpus`] if the directory cannot be listed.
    pub fn read_dir(dir: &Path, test_name: impl Into<String>) -> Result<Self> {
        let run_id = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut run = Self::new(test_name, run_id);

        let corpus_err = |source| Error::Corpus {
            path: dir.to_path_buf(),
            source,
        };
        for entry in std::fs::read_dir(dir).map_err(corpus_err)? {
            let entry = entry.map_err(corpus_err)?;
            let file_type = entry.file_type().map_err(corpus_err)?;
            if !file_type.is_file() {
                continue;
            }
            run.add_listed_file(entry.path());
        }

        tracing::debug!(run = %run.key, artifacts = run.artifacts.len(), "read run directory");
        Ok(run)
    }

    /// Get the run key.
    #[must_use]
    pub const fn key(&self) -> &RunKey {
        &self.key
    }

    /// Get the test group name.
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.key.test_name
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.key.run_id
    }

    /// Artifacts keyed by path.
    #[must_use]
    pub const fn artifacts(&self) -> &BTreeMap<PathBuf, Artifact> {
        &self.artifacts
    }

    /// Facts keyed by name.
    #[must_use]
    pub const fn facts(&self) -> &BTreeMap<String, Fact> {
        &self.facts
    }

    /// Look up one fact.
    #[must_use]
    pub fn fact(&self, name: &str) -> Option<&Fact> {
        self.facts.get(name)
    }

    /// Metrics in insertion order.
    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Attach a file found by a directory listing. A file that is gone by
    /// now is an artifact-level failure: logged and skipped.
    fn add_listed_file(&mut self, path: PathBuf) {
        match Artifact::new(path) {
            Ok(artifact) => self.add_artifact(artifact),
            Err(e) => tracing::warn!(run = %self.key, error = %e, "skipping artifact"),
        }
    }

    /// Attach an artifact, keyed by its path.
    pub fn add_artifact(&mut self, artifact: Artifact) {
        self.artifacts
            .entry(artifact.path().to_path_buf())
            .or_insert(artifact);
    }

    /// Add a fact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateFact`] if a fact of that name already
    /// exists; the existing fact is kept.
    pub fn add_fact(&mut self, fact: Fact) -> Result<()> {
        if self.facts.contains_key(fact.name()) {
            return Err(Error::DuplicateFact(fact.name().to_string()));
        }
        self.facts.insert(fact.name().to_string(), fact);
        Ok(())
    }

    /// Add a metric. Names need not be unique.
    pub fn add_metric(&mut self, metric: Metric) {
        self.metrics.push(metric);
    }

    /// Snapshot of fact name to value, units stripped.
    #[must_use]
    pub fn fact_values(&self) -> BTreeMap<String, FactValue> {
        self.facts
            .iter()
            .map(|(name, fact)| (name.clone(), fact.value().clone()))
            .collect()
    }
}
