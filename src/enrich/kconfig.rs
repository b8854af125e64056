//! Kernel build configuration (`kconfig`)

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact};
use crate::{Error, Result};

/// Basename of the captured `.config`.
pub const KCONFIG_FILE: &str = "kconfig";

/// Fact name prefix; `CONFIG_SMP=y` becomes `kconfig_CONFIG_SMP = "y"`.
pub const KCONFIG_FACT_PREFIX: &str = "kconfig_";

/// Turns each `KEY=VALUE` line of a kernel config into a string fact.
#[derive(Debug, Clone, Copy, Default)]
pub struct KconfigEnricher;

impl Enricher for KconfigEnricher {
    fn name(&self) -> &'static str {
        "kconfig"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, KCONFIG_FILE) {
            return Ok(Extraction::default());
        }

        let content = String::from_utf8(artifact.content()?)
            .map_err(|e| Error::extraction(artifact.path(), e.to_string()))?;

        let facts = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.starts_with('#'))
            .map(|line| {
                let (key, value) = line.split_once('=').ok_or_else(|| {
                    Error::extraction(
                        artifact.path(),
                        format!("failed to parse kconfig line: {line}"),
                    )
                })?;
                Ok(Fact::new(format!("{KCONFIG_FACT_PREFIX}{key}"), value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Extraction::from_facts(facts))
    }
}
