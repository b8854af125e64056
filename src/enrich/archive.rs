//! Nested result archives (`*.tar.gz`)
//!
//! The archive is unpacked into a private scratch directory and every
//! regular file is enriched with the nested [`EnricherSet`] this enricher
//! was built with. The scratch directory is owned by the call and removed
//! on every exit path.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use super::{Enricher, EnricherSet, Extraction};
use crate::model::Artifact;
use crate::{Error, Result};

/// Suffix of recognized archives.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

const SCRATCH_PREFIX: &str = "falba-enrich-tar-";

/// Re-applies a nested enricher set to each file inside a `.tar.gz`.
///
/// Recursion is bounded by construction: the nested set is built one
/// archive level shallower (see
/// [`EnricherSet::standard_with_archive_depth`]).
#[derive(Debug)]
pub struct ArchiveEnricher {
    nested: EnricherSet,
    scratch_root: Option<PathBuf>,
}

impl ArchiveEnricher {
    /// Create an archive enricher applying `nested` to extracted files.
    #[must_use]
    pub const fn new(nested: EnricherSet) -> Self {
        Self {
            nested,
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system
    /// temporary directory.
    #[must_use]
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Enrichers applied to archive contents.
    #[must_use]
    pub const fn nested(&self) -> &EnricherSet {
        &self.nested
    }

    fn enrich_entry(&self, extracted: &Artifact, entry_name: &Path, out: &mut Extraction) {
        for enricher in self.nested.iter() {
            match enricher.enrich(extracted) {
                Ok(mut extraction) => {
                    for warning in &mut extraction.warnings {
                        *warning = format!("{}: {warning}", entry_name.display());
                    }
                    out.append(extraction);
                }
                Err(err) => {
                    tracing::warn!(
                        enricher = enricher.name(),
                        entry = %entry_name.display(),
                        error = %err,
                        "nested enricher failed"
                    );
                    out.warnings.push(format!(
                        "{}: enricher {} failed: {err}",
                        entry_name.display(),
                        enricher.name()
                    ));
                }
            }
        }
    }
}

impl Enricher for ArchiveEnricher {
    fn name(&self) -> &'static str {
        "archive"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !artifact
            .file_name()
            .is_some_and(|name| name.ends_with(ARCHIVE_SUFFIX))
        {
            return Ok(Extraction::default());
        }

        let malformed = |e: std::io::Error| Error::extraction(artifact.path(), e.to_string());

        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| {
            Error::extraction(
                artifact.path(),
                format!("failed to create scratch directory: {e}"),
            )
        })?;

        let mut archive = tar::Archive::new(GzDecoder::new(artifact.open()?));
        let mut out = Extraction::default();

        for entry in archive.entries().map_err(malformed)? {
            let mut entry = entry.map_err(malformed)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let entry_name = entry.path().map_err(malformed)?.into_owned();
            let Some(relative) = scratch_relative_path(&entry_name) else {
                tracing::warn!(
                    archive = %artifact.path().display(),
                    entry = %entry_name.display(),
                    "skipping archive entry with unsafe path"
                );
                continue;
            };

            let dest = scratch.path().join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).map_err(malformed)?;
            }
            let mut file = File::create(&dest).map_err(malformed)?;
            std::io::copy(&mut entry, &mut file).map_err(malformed)?;
            drop(file);

            let extracted = Artifact::new(&dest)?;
            self.enrich_entry(&extracted, &entry_name, &mut out);
        }

        if out.facts.is_empty() && out.metrics.is_empty() {
            tracing::info!(archive = %artifact.path().display(), "no facts or metrics in archive contents");
        }

        if let Err(e) = scratch.close() {
            tracing::warn!(archive = %artifact.path().display(), error = %e, "failed to remove scratch directory");
        }
        Ok(out)
    }
}

/// Relative path of an archive entry inside the scratch directory, or
/// `None` if the entry is absolute or climbs out with `..`.
fn scratch_relative_path(entry: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}
