//! Facts and metrics - named, typed, optionally unit-tagged observations

use serde::{Deserialize, Serialize};

use super::FactValue;

/// A uniquely-named observation about a run (kernel version, cmdline, ...).
///
/// Names are unique within a [`Run`](super::Run); see
/// [`Run::add_fact`](super::Run::add_fact).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    name: String,
    value: FactValue,
    unit: Option<String>,
}

impl Fact {
    /// Create a fact with no unit.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<FactValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Get the fact name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the fact value.
    #[must_use]
    pub const fn value(&self) -> &FactValue {
        &self.value
    }

    /// Get the unit, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

/// A measurement taken by a run.
///
/// Unlike facts, several metrics on one run may share a name (repeated
/// samples, several histograms of the same probe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    value: FactValue,
    unit: Option<String>,
}

impl Metric {
    /// Create a metric with no unit.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<FactValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Get the metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the metric value.
    #[must_use]
    pub const fn value(&self) -> &FactValue {
        &self.value
    }

    /// Get the unit, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}
