//! FIO `--output-format=json+` results (`fio_output_*.json`)

use serde_json::Value;

use super::{Enricher, Extraction};
use crate::model::{Artifact, Metric};
use crate::{Error, Result};

const PREFIX: &str = "fio_output_";
const SUFFIX: &str = ".json";
const LATENCIES: &[&str] = &["lat_ns", "slat_ns", "clat_ns"];

/// Per-job read latency means and IOPS.
///
/// Emits `fio_<job>_read_{lat_ns,slat_ns,clat_ns}_mean` and
/// `fio_<job>_read_iops` for every job.
#[derive(Debug, Clone, Copy, Default)]
pub struct FioEnricher;

impl Enricher for FioEnricher {
    fn name(&self) -> &'static str {
        "fio"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !artifact
            .file_name()
            .is_some_and(|name| name.starts_with(PREFIX) && name.ends_with(SUFFIX))
        {
            return Ok(Extraction::default());
        }

        let output = artifact.json()?;
        let missing = |field: &str| {
            Error::extraction(
                artifact.path(),
                format!("missing field in FIO output JSON: {field}"),
            )
        };

        let jobs = output
            .get("jobs")
            .and_then(Value::as_array)
            .ok_or_else(|| missing("jobs"))?;

        let mut metrics = Vec::new();
        for job in jobs {
            let job_name = job
                .get("jobname")
                .and_then(Value::as_str)
                .ok_or_else(|| missing("jobname"))?;

            for latency in LATENCIES {
                let pointer = format!("/read/{latency}/mean");
                let mean = job
                    .pointer(&pointer)
                    .and_then(Value::as_f64)
                    .ok_or_else(|| missing(&pointer))?;
                metrics.push(Metric::new(
                    format!("fio_{job_name}_read_{latency}_mean"),
                    mean,
                ));
            }

            let iops = job
                .pointer("/read/iops")
                .and_then(Value::as_f64)
                .ok_or_else(|| missing("/read/iops"))?;
            metrics.push(Metric::new(format!("fio_{job_name}_read_iops"), iops));
        }

        Ok(Extraction::from_metrics(metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FactValue;

    #[test]
    fn test_job_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fio_output_1.json");
        std::fs::write(
            &path,
            r#"{"jobs": [{"jobname": "randread", "read": {
                "lat_ns": {"mean": 56960.234619},
                "slat_ns": {"mean": 0.0},
                "clat_ns": {"mean": 56932.733276},
                "iops": 17448.349308}}]}"#,
        )
        .unwrap();

        let extraction = FioEnricher.enrich(&Artifact::new(path).unwrap()).unwrap();
        let names: Vec<_> = extraction.metrics.iter().map(Metric::name).collect();
        assert_eq!(
            names,
            vec![
                "fio_randread_read_lat_ns_mean",
                "fio_randread_read_slat_ns_mean",
                "fio_randread_read_clat_ns_mean",
                "fio_randread_read_iops",
            ]
        );
        assert_eq!(extraction.metrics[3].value(), &FactValue::Float(17448.349308));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fio_output_2.json");
        std::fs::write(&path, r#"{"jobs": [{"jobname": "x", "read": {}}]}"#).unwrap();

        let err = FioEnricher.enrich(&Artifact::new(path).unwrap()).unwrap_err();
        assert!(err.to_string().contains("lat_ns"));
    }
}
