//! Predicate Engine
//!
//! One boolean expression in the Common Expression Language, parsed once
//! and evaluated against every run's [`Binding`].
//!
//! Facts are schemaless, so the set of bound names and their types varies
//! from run to run. A run whose evaluation fails (unbound name, type
//! mismatch, non-boolean result) is reported and treated as non-matching;
//! it never stops evaluation of the remaining runs.
//!
//! ## Example
//!
//! ```rust
//! use falba::model::{Corpus, Fact, Run};
//! use falba::query::{filter_corpus, Predicate};
//!
//! let mut run = Run::new("fio", "r1");
//! run.add_fact(Fact::new("os_id", "ubuntu"))?;
//! let corpus: Corpus = [run, Run::new("fio", "r2")].into_iter().collect();
//!
//! let predicate = Predicate::compile(r#"os_id == "ubuntu""#)?;
//! let outcome = filter_corpus(&corpus, &predicate);
//!
//! assert_eq!(outcome.matches.len(), 1);
//! assert_eq!(outcome.failures.len(), 1); // r2 has no os_id
//! # Ok::<(), falba::Error>(())
//! ```

mod binding;
mod check;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use cel_interpreter::{Context, ExecutionError, Program, Value};
use cel_parser::Expression;

pub use binding::{is_reserved, Binding, DeclaredType, RESERVED_WORDS, RUN_ID, TEST_NAME};

use crate::model::{Corpus, Run, RunKey};
use crate::{Error, Result};

/// A compiled boolean predicate.
pub struct Predicate {
    source: String,
    ast: Expression,
    program: Program,
    /// Declaration signature to type-check verdict (`Some` holds the mismatch).
    checked: Mutex<HashMap<String, Option<String>>>,
}

impl Predicate {
    /// Parse `expr`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpressionParse`] if `expr` is not a valid expression.
    pub fn compile(expr: &str) -> Result<Self> {
        let program = Program::compile(expr).map_err(|e| Error::ExpressionParse(e.to_string()))?;
        let ast = cel_parser::parse(expr).map_err(|e| Error::ExpressionParse(e.to_string()))?;
        Ok(Self {
            source: expr.to_string(),
            ast,
            program,
            checked: Mutex::new(HashMap::new()),
        })
    }

    /// Expression text as given to [`compile`](Self::compile).
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names the expression reads.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .program
            .references()
            .variables()
            .into_iter()
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Evaluate against one binding.
    ///
    /// # Errors
    ///
    /// - [`Error::Evaluation`] if a comparison mixes incompatible declared
    ///   types, or on any runtime failure other than an unbound name
    /// - [`Error::UnboundName`] if the expression reads a name that is not bound
    /// - [`Error::NonBoolean`] if the result is not a boolean
    pub fn evaluate(&self, binding: &Binding) -> Result<bool> {
        self.type_check(binding)?;

        let mut context = Context::default();
        for (name, value) in binding.iter() {
            context
                .add_variable(name, value)
                .map_err(|e| Error::Evaluation(format!("cannot bind '{name}': {e}")))?;
        }

        match self.program.execute(&context) {
            Ok(Value::Bool(matched)) => Ok(matched),
            Ok(other) => Err(Error::NonBoolean(format!("{other:?}"))),
            Err(ExecutionError::UndeclaredReference(name)) => {
                Err(Error::UnboundName(name.to_string()))
            }
            Err(e) => Err(Error::Evaluation(e.to_string())),
        }
    }

    /// Evaluate against [`Binding::for_run`].
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn matches(&self, run: &Run) -> Result<bool> {
        self.evaluate(&Binding::for_run(run))
    }

    /// Check relations against the binding's declarations. Verdicts are
    /// cached per declaration signature.
    fn type_check(&self, binding: &Binding) -> Result<()> {
        let mut checked = self.checked.lock().unwrap_or_else(PoisonError::into_inner);
        let verdict = checked
            .entry(binding.signature())
            .or_insert_with(|| check::first_mismatch(&self.ast, &binding.declarations()));

        match verdict {
            Some(mismatch) => Err(Error::Evaluation(mismatch.clone())),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Result of evaluating a predicate over a corpus.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    /// Runs for which the predicate evaluated to true, in corpus order
    pub matches: Vec<RunKey>,
    /// Runs whose evaluation failed
    pub failures: Vec<(RunKey, Error)>,
}

/// Evaluate `predicate` against every run of `corpus`.
#[must_use]
pub fn filter_corpus(corpus: &Corpus, predicate: &Predicate) -> QueryOutcome {
    let mut outcome = QueryOutcome::default();
    for run in corpus.runs() {
        match predicate.matches(run) {
            Ok(true) => outcome.matches.push(run.key().clone()),
            Ok(false) => {}
            Err(e) => {
                tracing::debug!(run = %run.key(), error = %e, "predicate evaluation failed");
                outcome.failures.push((run.key().clone(), e));
            }
        }
    }
    outcome
}
