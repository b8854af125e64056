//! Ansible setup-module output (`ansible.json`)

use serde_json::Value;

use super::{basename_is, Enricher, Extraction};
use crate::model::{Artifact, Fact, FactValue};
use crate::{Error, Result};

/// Basename of the collector output.
pub const ANSIBLE_FILE: &str = "ansible.json";

const FACTS_KEY: &str = "ansible_facts";
const KEY_PREFIX: &str = "ansible_";

/// Keys under `ansible_facts` become facts with the `ansible_` prefix
/// stripped (`ansible_kernel` → `kernel`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsibleEnricher;

impl Enricher for AnsibleEnricher {
    fn name(&self) -> &'static str {
        "ansible"
    }

    fn enrich(&self, artifact: &Artifact) -> Result<Extraction> {
        if !basename_is(artifact, ANSIBLE_FILE) {
            return Ok(Extraction::default());
        }

        let mut root = artifact.json()?;
        let facts = match root.get_mut(FACTS_KEY).map(Value::take) {
            None => {
                tracing::debug!(path = %artifact.path().display(), "no ansible_facts namespace");
                Vec::new()
            }
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, value)| {
                    let name = key.strip_prefix(KEY_PREFIX).unwrap_or(&key).to_string();
                    Fact::new(name, FactValue::from(value))
                })
                .collect(),
            Some(other) => {
                return Err(Error::extraction(
                    artifact.path(),
                    format!("{FACTS_KEY} is a {}, expected an object", json_kind(&other)),
                ))
            }
        };

        Ok(Extraction::from_facts(facts))
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
