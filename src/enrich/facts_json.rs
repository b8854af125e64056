//! Generic `falba-facts.json` facts file

use serde_json::Value;

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact, FactValue};
use crate::{Error, Result};

/// Basename of the generic facts file.
pub const FACTS_FILE: &str = "falba-facts.json";

/// Every top-level key of `falba-facts.json` becomes a fact.
///
/// A value shaped `{"value": v, "unit": "u"}` yields fact value `v` with
/// unit `u`; any other value is used verbatim with no unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct FactsJsonEnricher;

impl Enricher for FactsJsonEnricher {
    fn name(&self) -> &'static str {
        "facts_json"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, FACTS_FILE) {
            return Ok(Extraction::default());
        }

        let Value::Object(entries) = artifact.json()? else {
            return Err(Error::extraction(
                artifact.path(),
                "expected a top-level JSON object",
            ));
        };

        let facts = entries
            .into_iter()
            .map(|(name, value)| fact_from_entry(name, value))
            .collect();
        Ok(Extraction::from_facts(facts))
    }
}

fn fact_from_entry(name: String, value: Value) -> Fact {
    match value {
        Value::Object(mut object) if object.contains_key("value") => {
            let inner = object.remove("value").unwrap_or(Value::Null);
            let fact = Fact::new(name, FactValue::from(inner));
            match object.remove("unit") {
                Some(Value::String(unit)) => fact.with_unit(unit),
                _ => fact,
            }
        }
        other => Fact::new(name, FactValue::from(other)),
    }
}
