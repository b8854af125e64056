//! Integration tests for the enricher set
//!
//! Fixtures are written to a temporary directory; archives are built with
//! `tar::Builder` over a gzip encoder.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use falba::enrich::{
    ArchiveEnricher, Enricher, EnricherSet, FactsJsonEnricher, KconfigEnricher, SysfsCpuEnricher,
    TraceLogEnricher,
};
use falba::model::{Artifact, Fact, FactValue};
use falba::Error;

fn write(dir: &Path, name: &str, body: &[u8]) -> Artifact {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    Artifact::new(path).unwrap()
}

fn gzip(body: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

/// Build a `.tar.gz` from `(entry name, content)` pairs.
fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    gzip(&tar_bytes(entries))
}

/// Uncompressed tar of `(entry name, content)` pairs. Entry names are
/// written raw so unsafe paths survive into the archive.
fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        let raw = &mut header.as_old_mut().name;
        raw[..name.len()].copy_from_slice(name.as_bytes());
        header.set_cksum();
        builder.append(&header, *body).unwrap();
    }
    builder.into_inner().unwrap()
}

fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// ============================================================================
// Generic facts JSON
// ============================================================================

#[test]
fn test_facts_json_literal_and_unit_entries() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(
        dir.path(),
        "falba-facts.json",
        br#"{"kernel": "6.9.0", "memory": {"value": 512, "unit": "MB"}, "smt": true}"#,
    );

    let extraction = FactsJsonEnricher.enrich(&artifact).unwrap();
    assert_eq!(extraction.facts.len(), 3);

    let memory = extraction
        .facts
        .iter()
        .find(|f| f.name() == "memory")
        .unwrap();
    assert_eq!(memory.value(), &FactValue::Int(512));
    assert_eq!(memory.unit(), Some("MB"));
}

#[test]
fn test_facts_json_invalid_json_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "falba-facts.json", b"{not json");
    assert!(matches!(
        FactsJsonEnricher.enrich(&artifact),
        Err(Error::Json { .. })
    ));
}

// ============================================================================
// Non-interference
// ============================================================================

#[test]
fn test_unrecognized_artifact_ignored_by_every_enricher() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "dmesg.txt", b"@not_a_metric: 12\n");

    for enricher in EnricherSet::standard().iter() {
        let extraction = enricher.enrich(&artifact).unwrap();
        assert!(extraction.is_empty(), "{} produced output", enricher.name());
    }
}

// ============================================================================
// Trace logs
// ============================================================================

#[test]
fn test_trace_log_gz_streaming() {
    let dir = tempfile::tempdir().unwrap();
    let log = b"Attaching 3 probes...\n@syscalls: 1234\n@lat[0]: 5\n@lat[1]: 7\n@sz[0]: 1\n";
    let artifact = write(dir.path(), "bpftrace.log.gz", &gzip(log));

    let extraction = TraceLogEnricher.enrich(&artifact).unwrap();
    assert_eq!(extraction.facts, vec![Fact::new("instrumented", true)]);

    let metrics = extraction.metrics;
    let names: Vec<_> = metrics.iter().map(|m| m.name().to_string()).collect();
    assert_eq!(names, vec!["syscalls", "lat_hist", "sz_hist"]);

    let lat = metrics[1].value().as_map().unwrap();
    assert_eq!(lat.len(), 2);
    assert_eq!(lat["1"], FactValue::Int(7));
}

#[test]
fn test_empty_trace_log_warns() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "bpftrace.log", b"Attaching 1 probe...\n");

    let extraction = TraceLogEnricher.enrich(&artifact).unwrap();
    assert!(extraction.metrics.is_empty());
    assert!(extraction.facts.is_empty());
    assert_eq!(extraction.warnings.len(), 1);
}

#[test]
fn test_corrupt_gzip_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "bpftrace.log.gz", b"definitely not gzip");
    assert!(TraceLogEnricher.enrich(&artifact).is_err());
}

// ============================================================================
// System snapshots
// ============================================================================

#[test]
fn test_sysfs_vulnerabilities_become_facts() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = tar_gz(&[
        ("/sys/devices/system/cpu/online", b"0-7\n"),
        (
            "/sys/devices/system/cpu/vulnerabilities/retbleed",
            b"Mitigation: untrained return thunk\n\0\0",
        ),
        ("/sys/devices/system/cpu/vulnerabilities/mds", b"Not affected\n"),
    ]);
    let artifact = write(dir.path(), "sysfs_cpu.tgz", &snapshot);

    let extraction = SysfsCpuEnricher.enrich(&artifact).unwrap();
    assert_eq!(
        extraction.facts,
        vec![
            Fact::new("sysfs_cpu_vuln:retbleed", "Mitigation: untrained return thunk"),
            Fact::new("sysfs_cpu_vuln:mds", "Not affected"),
        ]
    );
    assert!(extraction.metrics.is_empty());
}

#[test]
fn test_sysfs_corrupt_snapshot_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "sysfs_cpu.tgz", b"not gzip");
    assert!(SysfsCpuEnricher.enrich(&artifact).is_err());
}

#[test]
fn test_kconfig_options_become_prefixed_facts() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(
        dir.path(),
        "kconfig",
        b"# CONFIG_FOO is not set\nCONFIG_SMP=y\nCONFIG_HZ=250\n",
    );

    let extraction = KconfigEnricher.enrich(&artifact).unwrap();
    let names: Vec<_> = extraction.facts.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["kconfig_CONFIG_SMP", "kconfig_CONFIG_HZ"]);
    assert_eq!(extraction.facts[1].value().as_str(), Some("250"));
}

// ============================================================================
// Archives
// ============================================================================

#[test]
fn test_archive_contents_are_enriched() {
    let dir = tempfile::tempdir().unwrap();
    let archive = tar_gz(&[
        ("out/falba-facts.json", br#"{"kernel": "6.9.0"}"#),
        ("out/bpftrace.log", b"@faults: 3\n"),
    ]);
    let artifact = write(dir.path(), "results.tar.gz", &archive);

    let extraction = EnricherSet::standard()
        .iter()
        .find(|e| e.name() == "archive")
        .unwrap()
        .enrich(&artifact)
        .unwrap();

    let names: Vec<_> = extraction.facts.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["kernel", "instrumented"]);
    assert_eq!(extraction.metrics.len(), 1);
    assert_eq!(extraction.metrics[0].name(), "faults");
}

#[test]
fn test_archive_unsafe_entries_never_escape_scratch() {
    let dir = tempfile::tempdir().unwrap();
    let outside = dir.path().join("escaped");
    std::fs::create_dir_all(&outside).unwrap();

    let archive = tar_gz(&[
        ("../../escaped/falba-facts.json", br#"{"evil": true}"#),
        ("/tmp/falba-absolute-facts.json", br#"{"evil": true}"#),
        ("falba-facts.json", br#"{"kernel": "6.9.0"}"#),
    ]);
    let artifact = write(dir.path(), "results.tar.gz", &archive);

    let extraction = ArchiveEnricher::new(EnricherSet::leaves())
        .enrich(&artifact)
        .unwrap();

    let names: Vec<_> = extraction.facts.iter().map(|f| f.name()).collect();
    assert_eq!(names, vec!["kernel"]);
    assert!(std::fs::read_dir(&outside).unwrap().next().is_none());
    assert!(!PathBuf::from("/tmp/falba-absolute-facts.json").exists());
}

#[test]
fn test_nested_archive_respects_depth() {
    let dir = tempfile::tempdir().unwrap();
    let inner = tar_gz(&[("falba-facts.json", br#"{"inner": 1}"#)]);
    let outer = tar_gz(&[
        ("inner.tar.gz", inner.as_slice()),
        ("falba-facts.json", br#"{"outer": 1}"#),
    ]);
    let artifact = write(dir.path(), "outer.tar.gz", &outer);

    let archive_of = |set: EnricherSet| {
        set.iter()
            .find(|e| e.name() == "archive")
            .unwrap()
            .enrich(&artifact)
            .unwrap()
    };

    let shallow = archive_of(EnricherSet::standard_with_archive_depth(1));
    let names: Vec<_> = shallow.facts.iter().map(|f| f.name().to_string()).collect();
    assert_eq!(names, vec!["outer"]);

    let deep = archive_of(EnricherSet::standard_with_archive_depth(2));
    let mut names: Vec<_> = deep.facts.iter().map(|f| f.name().to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["inner", "outer"]);
}

#[test]
fn test_archive_malformed_entry_becomes_warning() {
    let dir = tempfile::tempdir().unwrap();
    let archive = tar_gz(&[
        ("falba-facts.json", b"[1, 2]"),
        ("bpftrace.log", b"@ok: 1\n"),
    ]);
    let artifact = write(dir.path(), "results.tar.gz", &archive);

    let extraction = ArchiveEnricher::new(EnricherSet::leaves())
        .enrich(&artifact)
        .unwrap();
    assert_eq!(extraction.metrics.len(), 1);
    assert!(extraction
        .warnings
        .iter()
        .any(|w| w.starts_with("falba-facts.json")));
}

#[test]
fn test_truncated_archive_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = write(dir.path(), "results.tar.gz", &gzip(b"short"));
    assert!(ArchiveEnricher::new(EnricherSet::leaves())
        .enrich(&artifact)
        .is_err());
}

#[test]
fn test_scratch_removed_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let scratch_root = tempfile::tempdir().unwrap();
    let archive = tar_gz(&[("out/falba-facts.json", br#"{"kernel": "6.9.0"}"#)]);
    let artifact = write(dir.path(), "results.tar.gz", &archive);

    let extraction = ArchiveEnricher::new(EnricherSet::leaves())
        .with_scratch_root(scratch_root.path())
        .enrich(&artifact)
        .unwrap();

    assert_eq!(extraction.facts.len(), 1);
    assert!(is_empty_dir(scratch_root.path()));
}

#[test]
fn test_scratch_removed_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let scratch_root = tempfile::tempdir().unwrap();
    let enricher = ArchiveEnricher::new(EnricherSet::leaves()).with_scratch_root(scratch_root.path());

    // fails before any entry is read
    let short = write(dir.path(), "short.tar.gz", &gzip(b"short"));
    assert!(enricher.enrich(&short).is_err());
    assert!(is_empty_dir(scratch_root.path()));

    // first entry extracted, then a partial header block
    let mut raw = tar_bytes(&[("falba-facts.json", br#"{"kernel": "6.9.0"}"#)]);
    raw.truncate(1024);
    raw.extend_from_slice(&[b'x'; 100]);
    let truncated = write(dir.path(), "truncated.tar.gz", &gzip(&raw));
    assert!(enricher.enrich(&truncated).is_err());
    assert!(is_empty_dir(scratch_root.path()));
}
