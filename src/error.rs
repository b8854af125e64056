//! Error types for Falba
//!
//! Structural errors (unreadable corpus directories) are fatal; every other
//! variant is scoped to one artifact, one deriver invocation or one run's
//! evaluation and is collected rather than propagated.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Falba error types
#[derive(Error, Debug)]
pub enum Error {
    /// Artifact handle constructed over a path that does not exist
    #[error("artifact path {} does not exist", .0.display())]
    ArtifactMissing(PathBuf),

    /// Artifact exists but could not be read
    #[error("failed to read artifact {}: {source}", path.display())]
    ArtifactRead {
        /// Artifact path
        path: PathBuf,
        /// Underlying IO failure
        source: std::io::Error,
    },

    /// Artifact content is not valid JSON
    #[error("failed to parse JSON from {}: {source}", path.display())]
    Json {
        /// Artifact path
        path: PathBuf,
        /// Underlying parse failure
        source: serde_json::Error,
    },

    /// Artifact matched an enricher's shape but its content is malformed
    #[error("malformed artifact {}: {reason}", path.display())]
    Extraction {
        /// Artifact path
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },

    /// A fact of this name is already present on the run
    #[error("fact '{0}' already exists")]
    DuplicateFact(String),

    /// Corpus root, test-group or run directory unreadable (fatal)
    #[error("failed to read corpus directory {}: {source}", path.display())]
    Corpus {
        /// Directory that could not be read
        path: PathBuf,
        /// Underlying IO failure
        source: std::io::Error,
    },

    /// Enricher failed on one artifact
    #[error("enricher {enricher} failed on {}: {source}", path.display())]
    Enrichment {
        /// Registered enricher name
        enricher: &'static str,
        /// Artifact being processed
        path: PathBuf,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Deriver failed on one run
    #[error("deriver {deriver} failed for {run}: {source}")]
    Derivation {
        /// Registered deriver name
        deriver: &'static str,
        /// `test/run` identifier
        run: String,
        /// Underlying failure
        source: Box<Error>,
    },

    /// Expression could not be parsed
    #[error("expression parse error: {0}")]
    ExpressionParse(String),

    /// Expression references a name with no binding
    #[error("undeclared reference to '{0}'")]
    UnboundName(String),

    /// Expression failed at evaluation time (including type mismatches)
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// Expression evaluated to something other than a boolean
    #[error("expression did not yield a boolean, got {0}")]
    NonBoolean(String),
}

impl Error {
    /// Build an [`Error::Extraction`] for `path`.
    pub fn extraction(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for failures scoped to a single run's predicate evaluation.
    #[must_use]
    pub const fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::ExpressionParse(_)
                | Self::UnboundName(_)
                | Self::Evaluation(_)
                | Self::NonBoolean(_)
        )
    }
}
