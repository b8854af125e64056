//! Wall-clock timings written as bare integers (`compile-kernel_elapsed_ns_*`)

use super::{Enricher, Extraction};
use crate::model::{Artifact, Metric};
use crate::{Error, Result};

const PREFIX: &str = "compile-kernel_elapsed_ns_";

/// One `compile-kernel_elapsed` metric in nanoseconds per timing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedNsEnricher;

impl Enricher for ElapsedNsEnricher {
    fn name(&self) -> &'static str {
        "elapsed_ns"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !artifact
            .file_name()
            .is_some_and(|name| name.starts_with(PREFIX))
        {
            return Ok(Extraction::default());
        }

        let content = artifact.content()?;
        let ns: i64 = String::from_utf8_lossy(&content)
            .trim()
            .parse()
            .map_err(|_| Error::extraction(artifact.path(), "did not contain an integer"))?;

        Ok(Extraction::from_metrics(vec![
            Metric::new("compile-kernel_elapsed", ns).with_unit("ns")
        ]))
    }
}
