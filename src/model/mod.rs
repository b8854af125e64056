//! Attribute Model
//!
//! Value containers for everything the pipeline extracts from a benchmark
//! result tree. No logic beyond invariant enforcement lives here.
//!
//! ## Schema Overview
//!
//! ```text
//! Corpus (1) ──< Run (N)            keyed by (test_name, run_id)
//!                  │
//!                  ├──< Artifact (N) keyed by path
//!                  ├──< Fact (N)     keyed by name, unique
//!                  └──< Metric (N)   ordered, names may repeat
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use falba::model::{Fact, Metric, Run};
//!
//! let mut run = Run::new("compile-kernel", "836d59863d4a");
//! run.add_fact(Fact::new("kernel_version", "6.9.0"))?;
//! run.add_metric(Metric::new("compile-kernel_elapsed", 41_000_000_i64).with_unit("ns"));
//!
//! // A second fact with the same name is rejected
//! assert!(run.add_fact(Fact::new("kernel_version", "6.10.0")).is_err());
//! # Ok::<(), falba::Error>(())
//! ```

mod artifact;
mod attribute;
mod corpus;
mod run;
mod value;

pub use artifact::Artifact;
pub use attribute::{Fact, Metric};
pub use corpus::{Corpus, FlatRecord};
pub use run::{Run, RunKey};
pub use value::FactValue;
