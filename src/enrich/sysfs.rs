//! CPU vulnerability status from a sysfs snapshot (`sysfs_cpu.tgz`)
//!
//! The collector tars `/sys/devices/system/cpu`. Each file under
//! `vulnerabilities/` becomes a string fact `sysfs_cpu_vuln:<name>`, e.g.
//! `sysfs_cpu_vuln:retbleed = "Mitigation: untrained return thunk"`.
//! Members are read straight from the stream; nothing is unpacked to disk.

use std::io::Read;
use std::path::{Component, Path};

use flate2::read::GzDecoder;

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact};
use crate::{Error, Result};

/// Basename of the captured snapshot.
pub const SYSFS_CPU_FILE: &str = "sysfs_cpu.tgz";

/// Fact name prefix for vulnerability entries.
pub const VULN_FACT_PREFIX: &str = "sysfs_cpu_vuln:";

const VULN_DIR: [&str; 5] = ["sys", "devices", "system", "cpu", "vulnerabilities"];

/// Reads `/sys/devices/system/cpu/vulnerabilities/*` from a sysfs tarball.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsCpuEnricher;

impl Enricher for SysfsCpuEnricher {
    fn name(&self) -> &'static str {
        "sysfs_cpu"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, SYSFS_CPU_FILE) {
            return Ok(Extraction::default());
        }

        let malformed = |e: std::io::Error| Error::extraction(artifact.path(), e.to_string());
        let mut archive = tar::Archive::new(GzDecoder::new(artifact.open()?));
        let mut facts = Vec::new();

        for entry in archive.entries().map_err(malformed)? {
            let mut entry = entry.map_err(malformed)?;
            let path = entry.path().map_err(malformed)?.into_owned();
            let Some(name) = vulnerability_name(&path) else {
                continue;
            };
            if !entry.header().entry_type().is_file() {
                return Err(Error::extraction(
                    artifact.path(),
                    format!("not a regular file: {}", path.display()),
                ));
            }

            let mut raw = Vec::new();
            entry.read_to_end(&mut raw).map_err(malformed)?;
            let content = String::from_utf8(raw).map_err(|e| {
                Error::extraction(artifact.path(), format!("{}: {e}", path.display()))
            })?;

            // tar pads sysfs files with NULs
            let status = content.trim_matches('\0').trim();
            facts.push(Fact::new(format!("{VULN_FACT_PREFIX}{name}"), status));
        }

        Ok(Extraction::from_facts(facts))
    }
}

/// Final component of `path` if it sits directly in the vulnerabilities
/// directory. Leading `/` and `.` components are ignored.
fn vulnerability_name(path: &Path) -> Option<String> {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_str()),
            _ => None,
        })
        .collect::<Option<_>>()?;

    match parts.split_last() {
        Some((name, dir)) if dir == VULN_DIR.as_slice() => Some((*name).to_string()),
        _ => None,
    }
}
