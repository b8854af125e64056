//! End-to-end pipeline tests over an on-disk result tree
//!
//! Layout mirrors a real result database:
//! `<root>/<test_name>/<run_id>/<artifacts>`.

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use falba::model::{Corpus, FactValue, RunKey};
use falba::pipeline::{Pipeline, Warning};
use falba::Error;

fn write(root: &Path, rel: &str, body: &[u8]) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn gzip(body: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

/// Two test groups; `fio/b` carries a malformed phoronix report and
/// `compile-kernel/a` shares its run id with `fio/a`.
fn result_tree(root: &Path) {
    write(
        root,
        "fio/a/falba-facts.json",
        br#"{"kernel": "6.9.0", "nr_cpus": 8}"#,
    );
    write(
        root,
        "fio/a/ansible.json",
        br#"{"ansible_facts": {"ansible_cmdline": "mitigations=auto,nosmt", "ansible_kernel": "6.9.0"}}"#,
    );
    write(root, "fio/a/bpftrace.log.gz", &gzip(b"@reads: 10\n@lat[0]: 1\n"));
    write(root, "fio/a/etc_os-release", b"ID=nixos\nVERSION_ID=\"24.05\"\n");

    write(root, "fio/b/phoronix.json", br#"{"results": [1, 2]}"#);
    write(root, "fio/b/falba-facts.json", br#"{"kernel": "6.1.0"}"#);

    write(root, "compile-kernel/a/compile-kernel_elapsed_ns_0", b"1000\n");
    write(root, "compile-kernel/a/compile-kernel_elapsed_ns_1", b"1200\n");
}

#[test]
fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    result_tree(dir.path());

    let mut corpus = Corpus::read_dir(dir.path()).unwrap();
    assert_eq!(corpus.len(), 3);

    let pipeline = Pipeline::builder().parallel(false).build();
    let enriched = pipeline.enrich(&mut corpus);
    let derived = pipeline.derive(&mut corpus);

    // malformed phoronix report: one collected error, other artifacts still processed
    assert_eq!(enriched.errors.len(), 1);
    assert!(matches!(
        &enriched.errors[0],
        Error::Enrichment { enricher: "phoronix", .. }
    ));
    let b = corpus.get(&RunKey::new("fio", "b")).unwrap();
    assert_eq!(b.fact("kernel").unwrap().value().as_str(), Some("6.1.0"));

    // kernel appears in both falba-facts.json and ansible.json
    assert!(enriched.warnings.iter().any(|w| matches!(
        w,
        Warning::DuplicateFact { fact, .. } if fact == "kernel"
    )));

    let a = corpus.get(&RunKey::new("fio", "a")).unwrap();
    assert_eq!(a.fact("nr_cpus").unwrap().value(), &FactValue::Int(8));
    assert_eq!(a.fact("asi_on").unwrap().value(), &FactValue::Bool(true));
    assert_eq!(
        a.fact("os_release_version_id").unwrap().value().as_str(),
        Some("24.05")
    );
    let metric_names: Vec<_> = a.metrics().iter().map(|m| m.name()).collect();
    assert_eq!(metric_names, vec!["reads", "lat_hist"]);

    let compile = corpus.get(&RunKey::new("compile-kernel", "a")).unwrap();
    assert_eq!(compile.metrics().len(), 2);
    assert!(compile.facts().is_empty());

    assert!(derived.errors.is_empty());
}

#[test]
fn test_flat_records_cover_every_metric() {
    let dir = tempfile::tempdir().unwrap();
    result_tree(dir.path());

    let mut corpus = Corpus::read_dir(dir.path()).unwrap();
    let pipeline = Pipeline::default();
    pipeline.enrich(&mut corpus);
    pipeline.derive(&mut corpus);

    let records = corpus.flat_records();
    assert_eq!(records.len(), 4);
    assert!(records
        .iter()
        .filter(|r| r.metric == "compile-kernel_elapsed")
        .all(|r| r.unit.as_deref() == Some("ns") && r.test_name == "compile-kernel"));

    let line = serde_json::to_string(&records[0]).unwrap();
    assert!(line.contains("\"run_id\""));
}

#[test]
fn test_empty_root_yields_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = Corpus::read_dir(dir.path()).unwrap();
    assert!(corpus.is_empty());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_pipeline_matches_sequential() {
    let dir = tempfile::tempdir().unwrap();
    result_tree(dir.path());

    let process = |parallel: bool| {
        let mut corpus = Corpus::read_dir(dir.path()).unwrap();
        let pipeline = Pipeline::builder().parallel(parallel).build();
        let report = pipeline.enrich(&mut corpus);
        pipeline.derive(&mut corpus);
        (corpus, report.errors.len(), report.warnings)
    };

    let (seq, seq_errors, seq_warnings) = process(false);
    let (par, par_errors, par_warnings) = process(true);

    assert_eq!(seq_errors, par_errors);
    assert_eq!(seq_warnings, par_warnings);
    for run in seq.runs() {
        assert_eq!(par.get(run.key()).unwrap().fact_values(), run.fact_values());
    }
}
