//! Attribute model tests: corpus discovery, run invariants, flat export

use std::path::Path;

use falba::model::{Artifact, Corpus, Fact, FactValue, Metric, Run, RunKey};
use falba::Error;

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"{}").unwrap();
}

#[test]
fn test_discovery_layout() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "fio/r1/falba-facts.json");
    touch(dir.path(), "fio/r2/falba-facts.json");
    touch(dir.path(), "fio/r2/ansible.json");
    touch(dir.path(), "compile-kernel/r1/falba-facts.json");
    // stray files at group and root level are not runs
    touch(dir.path(), "README");
    touch(dir.path(), "fio/notes.txt");

    let corpus = Corpus::read_dir(dir.path()).unwrap();
    let keys: Vec<String> = corpus.runs().map(|r| r.key().to_string()).collect();
    assert_eq!(keys, vec!["compile-kernel/r1", "fio/r1", "fio/r2"]);

    let r2 = corpus.get(&RunKey::new("fio", "r2")).unwrap();
    assert_eq!(r2.artifacts().len(), 2);
}

#[test]
fn test_same_run_id_in_different_groups_both_kept() {
    let dir = tempfile::tempdir().unwrap();
    touch(dir.path(), "a/shared/falba-facts.json");
    touch(dir.path(), "b/shared/falba-facts.json");

    let corpus = Corpus::read_dir(dir.path()).unwrap();
    assert_eq!(corpus.len(), 2);
}

#[test]
fn test_missing_root_is_structural() {
    let dir = tempfile::tempdir().unwrap();
    let err = Corpus::read_dir(&dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, Error::Corpus { .. }));
    assert!(!err.is_query_error());
}

#[test]
fn test_artifact_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Artifact::new(dir.path().join("ghost.log")),
        Err(Error::ArtifactMissing(_))
    ));
}

#[test]
fn test_fact_uniqueness_reports_duplicate() {
    let mut run = Run::new("fio", "r1");
    run.add_fact(Fact::new("kernel", "6.1").with_unit("release"))
        .unwrap();

    let err = run.add_fact(Fact::new("kernel", "6.2")).unwrap_err();
    assert_eq!(err.to_string(), "fact 'kernel' already exists");

    let kept = run.fact("kernel").unwrap();
    assert_eq!(kept.value().as_str(), Some("6.1"));
    assert_eq!(kept.unit(), Some("release"));
}

#[test]
fn test_metric_multiplicity() {
    let mut run = Run::new("fio", "r1");
    for i in 0..5_i64 {
        run.add_metric(Metric::new("iops", i));
    }
    let values: Vec<_> = run.metrics().iter().map(|m| m.value().as_i64()).collect();
    assert_eq!(values, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
}

#[test]
fn test_fact_value_json_shape() {
    let value = FactValue::from(serde_json::json!({"a": [1, 2.5, "x", null, true]}));
    assert_eq!(value.type_name(), "map");
    assert_eq!(value.to_string(), r#"{"a":[1,2.5,"x",null,true]}"#);
}
