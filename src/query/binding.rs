//! Per-run name bindings and their inferred declarations

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{FactValue, Run};

/// Binding name carrying the run identifier.
pub const RUN_ID: &str = "run_id";
/// Binding name carrying the test-group name.
pub const TEST_NAME: &str = "test_name";

/// Identifiers the expression language reserves; facts with these names
/// are never bound.
pub const RESERVED_WORDS: &[&str] = &[
    "as", "break", "const", "continue", "else", "false", "for", "function", "if", "import", "in",
    "let", "loop", "namespace", "null", "package", "return", "true", "var", "void", "while",
];

/// True if `name` is a reserved word.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Declared type of a bound name, inferred from its runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclaredType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Null, lists, maps: checked only at evaluation time
    Dyn,
}

impl DeclaredType {
    /// Infer the declaration for `value`. Total over [`FactValue`].
    #[must_use]
    pub const fn of(value: &FactValue) -> Self {
        match value {
            FactValue::Bool(_) => Self::Bool,
            FactValue::Int(_) => Self::Int,
            FactValue::Float(_) => Self::Double,
            FactValue::String(_) => Self::String,
            FactValue::Null | FactValue::List(_) | FactValue::Map(_) => Self::Dyn,
        }
    }

    /// Type name as the expression language spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::Dyn => "dyn",
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name-to-value map exposed to a predicate for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Binding {
    values: BTreeMap<String, FactValue>,
}

impl Binding {
    /// Bind a run's fact values plus the synthetic `run_id` and `test_name`.
    ///
    /// The synthetic names always win over facts of the same name.
    #[must_use]
    pub fn for_run(run: &Run) -> Self {
        let mut binding = Self::default();
        for (name, value) in run.fact_values() {
            binding = binding.with(name, value);
        }

        for (name, value) in [(RUN_ID, run.run_id()), (TEST_NAME, run.test_name())] {
            if binding.values.insert(name.to_string(), value.into()).is_some() {
                tracing::debug!(run = %run.key(), fact = name, "fact shadowed by synthetic binding");
            }
        }
        binding
    }

    /// Add a binding. Reserved words are skipped.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FactValue>) -> Self {
        let name = name.into();
        if is_reserved(&name) {
            tracing::debug!(name = %name, "reserved word not bound");
        } else {
            self.values.insert(name, value.into());
        }
        self
    }

    /// Value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.values.get(name)
    }

    /// True if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bound names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bound names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Inferred declaration for every bound name.
    #[must_use]
    pub fn declarations(&self) -> BTreeMap<&str, DeclaredType> {
        self.iter()
            .map(|(name, value)| (name, DeclaredType::of(value)))
            .collect()
    }

    /// Stable `name:type` rendering of [`declarations`](Self::declarations).
    /// Runs with the same signature type-check identically.
    #[must_use]
    pub fn signature(&self) -> String {
        self.declarations()
            .into_iter()
            .map(|(name, ty)| format!("{name}:{ty}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}
