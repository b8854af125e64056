//! Facts derived from ansible setup-module output
//!
//! These read the prefix-stripped facts produced by
//! [`AnsibleEnricher`](crate::enrich::AnsibleEnricher).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::Deriver;
use crate::enrich::Extraction;
use crate::model::{Fact, FactValue, Run};
use crate::Result;

const DATE_TIME: &str = "date_time";
const PROCESSOR: &str = "processor";

/// `timestamp` (RFC 3339, UTC) and `timestamp_epoch` (seconds) from the
/// `date_time` fact's `iso8601_micro` or `iso8601` member.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampDeriver;

impl Deriver for TimestampDeriver {
    fn name(&self) -> &'static str {
        "timestamp"
    }

    fn derive(&self, run: &Run) -> Result<Extraction> {
        let Some(date_time) = run.fact(DATE_TIME).and_then(|f| f.value().as_map()) else {
            tracing::debug!(run = %run.key(), "no date_time map, skipping");
            return Ok(Extraction::default());
        };

        let parsed = ["iso8601_micro", "iso8601"]
            .iter()
            .filter_map(|key| date_time.get(*key).and_then(FactValue::as_str))
            .find_map(|raw| DateTime::parse_from_rfc3339(raw).ok());

        let Some(timestamp) = parsed.map(|ts| ts.with_timezone(&Utc)) else {
            tracing::debug!(run = %run.key(), "date_time has no parseable ISO 8601 member");
            return Ok(Extraction::default());
        };

        Ok(Extraction::from_facts(vec![
            Fact::new("timestamp", timestamp.to_rfc3339()),
            Fact::new("timestamp_epoch", timestamp.timestamp()).with_unit("s"),
        ]))
    }
}

/// `cpu_model` from the `processor` fact, a flat list of
/// `(index, vendor, model)` triples. Distinct `vendor model` strings are
/// joined with ` + `.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuModelDeriver;

impl Deriver for CpuModelDeriver {
    fn name(&self) -> &'static str {
        "cpu_model"
    }

    fn derive(&self, run: &Run) -> Result<Extraction> {
        let Some(processor) = run.fact(PROCESSOR).and_then(|f| f.value().as_list()) else {
            return Ok(Extraction::default());
        };
        if processor.is_empty() || processor.len() % 3 != 0 {
            tracing::debug!(run = %run.key(), len = processor.len(), "processor list is not index/vendor/model triples");
            return Ok(Extraction::default());
        }

        let mut models = BTreeSet::new();
        for triple in processor.chunks_exact(3) {
            let (Some(vendor), Some(model)) = (triple[1].as_str(), triple[2].as_str()) else {
                return Ok(Extraction::default());
            };
            models.insert(format!("{vendor} {model}"));
        }

        let cpu_model = models.into_iter().collect::<Vec<_>>().join(" + ");
        Ok(Extraction::from_facts(vec![Fact::new("cpu_model", cpu_model)]))
    }
}
