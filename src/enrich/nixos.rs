//! NixOS system identification (`nixos-version.json`, `nixos-system.txt`)

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact, FactValue};
use crate::{Error, Result};

/// Output of `nixos-version --json`.
pub const NIXOS_VERSION_FILE: &str = "nixos-version.json";
/// Store path of the booted system.
pub const NIXOS_SYSTEM_FILE: &str = "nixos-system.txt";

/// `configurationRevision` from `nixos-version --json` as the
/// `nixos_configuration_revision` fact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixosVersionEnricher;

impl Enricher for NixosVersionEnricher {
    fn name(&self) -> &'static str {
        "nixos_version"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, NIXOS_VERSION_FILE) {
            return Ok(Extraction::default());
        }

        let mut version = artifact.json()?;
        let revision = version
            .get_mut("configurationRevision")
            .map(serde_json::Value::take)
            .ok_or_else(|| {
                Error::extraction(artifact.path(), "missing field configurationRevision")
            })?;

        Ok(Extraction::from_facts(vec![Fact::new(
            "nixos_configuration_revision",
            FactValue::from(revision),
        )]))
    }
}

/// Whole content of `nixos-system.txt` as the `nixos_system` fact.
#[derive(Debug, Clone, Copy, Default)]
pub struct NixosSystemEnricher;

impl Enricher for NixosSystemEnricher {
    fn name(&self) -> &'static str {
        "nixos_system"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, NIXOS_SYSTEM_FILE) {
            return Ok(Extraction::default());
        }

        let content = artifact.content()?;
        let system = String::from_utf8_lossy(&content).trim().to_string();
        Ok(Extraction::from_facts(vec![Fact::new("nixos_system", system)]))
    }
}
