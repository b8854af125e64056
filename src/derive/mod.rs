//! Deriver Set - fact-to-fact computation
//!
//! A [`Deriver`] reads only a run's already-materialized facts. A deriver
//! whose input facts are absent or of an unexpected type is "not
//! applicable" and returns an empty [`Extraction`]; that is never an error.
//!
//! Derivers run in registration order and the driver applies each one's
//! output before invoking the next, so later derivers see earlier output.

mod ansible;
mod mitigations;

use std::fmt;

pub use ansible::{CpuModelDeriver, TimestampDeriver};
pub use mitigations::{AsiOnDeriver, RetbleedMitigation, RetbleedMitigationDeriver};

use crate::enrich::Extraction;
use crate::model::Run;
use crate::Result;

/// Computes new facts or metrics from a run's existing facts.
pub trait Deriver: Send + Sync {
    /// Stable name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Derive from `run`.
    ///
    /// # Errors
    ///
    /// Reserved for genuine failures; missing or mistyped inputs yield
    /// `Ok(Extraction::default())`.
    fn derive(&self, run: &Run) -> Result<Extraction>;
}

/// Ordered list of derivers.
#[derive(Default)]
pub struct DeriverSet {
    derivers: Vec<Box<dyn Deriver>>,
}

impl DeriverSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deriver.
    #[must_use]
    pub fn with(mut self, deriver: impl Deriver + 'static) -> Self {
        self.derivers.push(Box::new(deriver));
        self
    }

    /// Every built-in deriver, in order.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(AsiOnDeriver)
            .with(RetbleedMitigationDeriver)
            .with(TimestampDeriver)
            .with(CpuModelDeriver)
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Deriver> {
        self.derivers.iter().map(AsRef::as_ref)
    }

    /// Registered names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Deriver::name).collect()
    }

    /// Number of registered derivers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.derivers.len()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.derivers.is_empty()
    }
}

impl fmt::Debug for DeriverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// String value of fact `name`, or `None` (logged) when absent or not a string.
fn string_fact<'a>(run: &'a Run, deriver: &str, name: &str) -> Option<&'a str> {
    let Some(fact) = run.fact(name) else {
        tracing::debug!(deriver, run = %run.key(), fact = name, "fact not found, skipping");
        return None;
    };
    let value = fact.value().as_str();
    if value.is_none() {
        tracing::debug!(
            deriver,
            run = %run.key(),
            fact = name,
            actual = fact.value().type_name(),
            "fact is not a string, skipping"
        );
    }
    value
}
