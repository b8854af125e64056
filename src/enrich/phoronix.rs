//! Phoronix Test Suite report (`phoronix.json`)

use serde_json::Value;

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact, FactValue, Metric};
use crate::{Error, Result};

/// Basename of the suite report.
pub const PHORONIX_FILE: &str = "phoronix.json";

/// `system.hardware` becomes the `phoronix_system_hardware` fact; each
/// entry under `results` becomes a metric named by its `title`, valued by
/// its `value`, with its non-empty `scale` as unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhoronixEnricher;

impl Enricher for PhoronixEnricher {
    fn name(&self) -> &'static str {
        "phoronix"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, PHORONIX_FILE) {
            return Ok(Extraction::default());
        }

        let report = artifact.json()?;
        let mut extraction = Extraction::default();

        if let Some(hardware) = report.pointer("/system/hardware").and_then(Value::as_str) {
            extraction
                .facts
                .push(Fact::new("phoronix_system_hardware", hardware));
        }

        match report.get("results") {
            None => {}
            Some(Value::Object(results)) => {
                for (key, result) in results {
                    match metric_from_result(result) {
                        Some(metric) => extraction.metrics.push(metric),
                        None => tracing::debug!(
                            path = %artifact.path().display(),
                            result = %key,
                            "skipping phoronix result without title/value"
                        ),
                    }
                }
            }
            Some(_) => {
                return Err(Error::extraction(
                    artifact.path(),
                    "results is not an object",
                ))
            }
        }

        Ok(extraction)
    }
}

fn metric_from_result(result: &Value) -> Option<Metric> {
    let title = result.get("title")?.as_str()?;
    let value = match result.get("value")? {
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
        scalar => FactValue::from(scalar.clone()),
    };

    let metric = Metric::new(title, value);
    Some(match result.get("scale").and_then(Value::as_str) {
        Some(scale) if !scale.is_empty() => metric.with_unit(scale),
        _ => metric,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metric_with_scale() {
        let metric =
            metric_from_result(&json!({"title": "FIO", "value": "1234.5", "scale": "IOPS"}))
                .unwrap();
        assert_eq!(metric.name(), "FIO");
        assert_eq!(metric.value().as_str(), Some("1234.5"));
        assert_eq!(metric.unit(), Some("IOPS"));
    }

    #[test]
    fn test_empty_scale_means_no_unit() {
        let metric = metric_from_result(&json!({"title": "t", "value": 3, "scale": ""})).unwrap();
        assert_eq!(metric.unit(), None);
        assert_eq!(metric.value(), &FactValue::Int(3));
    }

    #[test]
    fn test_result_without_value_skipped() {
        assert!(metric_from_result(&json!({"title": "t"})).is_none());
        assert!(metric_from_result(&json!({"value": 1})).is_none());
    }
}
