//! Captured `/etc/os-release` (`etc_os-release`)

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact};
use crate::{Error, Result};

/// Basename of the captured file.
pub const OS_RELEASE_FILE: &str = "etc_os-release";

/// os-release keys surfaced as facts, with their fact names.
const SELECTED: &[(&str, &str)] = &[
    ("ID", "os_release_id"),
    ("VERSION_ID", "os_release_version_id"),
    ("VARIANT_ID", "os_release_variant_id"),
];

/// Reads selected `KEY=VALUE` fields from an os-release file.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsReleaseEnricher;

impl Enricher for OsReleaseEnricher {
    fn name(&self) -> &'static str {
        "os_release"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, OS_RELEASE_FILE) {
            return Ok(Extraction::default());
        }

        let content = String::from_utf8(artifact.content()?)
            .map_err(|e| Error::extraction(artifact.path(), e.to_string()))?;

        let mut fields = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, raw) = line.split_once('=').ok_or_else(|| {
                Error::extraction(artifact.path(), format!("not a KEY=VALUE line: {line}"))
            })?;
            let value = unquote(raw).ok_or_else(|| {
                Error::extraction(
                    artifact.path(),
                    format!("invalid os-release value for {key}: {raw}"),
                )
            })?;
            fields.push((key, value));
        }

        let facts = SELECTED
            .iter()
            .filter_map(|(key, fact_name)| {
                fields
                    .iter()
                    .rev()
                    .find(|(k, _)| k == key)
                    .map(|(_, value)| Fact::new(*fact_name, value.as_str()))
            })
            .collect();
        Ok(Extraction::from_facts(facts))
    }
}

/// Strip one level of matching quotes. Unquoted values must be one word.
fn unquote(raw: &str) -> Option<String> {
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(raw[1..raw.len() - 1].to_string());
        }
    }
    if raw.contains(char::is_whitespace) || raw.contains(['"', '\'']) {
        return None;
    }
    Some(raw.to_string())
}
