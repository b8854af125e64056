//! # Falba: Benchmark Result Analysis
//!
//! Falba turns a directory tree of raw benchmark outputs into a typed
//! [`Corpus`](model::Corpus) of runs, each carrying unique *facts* (what the
//! run was: kernel, cmdline, CPU) and repeatable *metrics* (what it measured),
//! and lets you select runs with a boolean expression over their facts.
//!
//! ## Pipeline
//!
//! ```text
//! result tree ──> Corpus ──> enrichers ──> derivers ──> predicate ──> matches
//!                 (runs,      (artifact      (facts →     (CEL, per
//!                 artifacts)   → facts,       facts)       run)
//!                              metrics)
//! ```
//!
//! - **Partial failure**: a malformed artifact costs that artifact, not the
//!   batch. Errors are collected per phase in a
//!   [`PhaseReport`](pipeline::PhaseReport).
//! - **Bounded recursion**: archives are re-enriched with an explicitly
//!   constructed nested enricher set, to a configurable depth.
//! - **Run-level parallelism** (feature `parallel`): runs share no mutable
//!   state, so each phase can fan out across the rayon pool.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use falba::model::Corpus;
//! use falba::pipeline::Pipeline;
//! use falba::query::{filter_corpus, Predicate};
//!
//! let mut corpus = Corpus::read_dir(Path::new("results"))?;
//! let pipeline = Pipeline::builder().build();
//! pipeline.enrich(&mut corpus).log("enrich");
//! pipeline.derive(&mut corpus).log("derive");
//!
//! let predicate = Predicate::compile(r#"asi_on && os_release_id == "nixos""#)?;
//! for key in filter_corpus(&corpus, &predicate).matches {
//!     println!("{key}");
//! }
//! # Ok::<(), falba::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod derive;
pub mod enrich;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod query;
pub mod telemetry;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineBuilder};
