//! # msdopt
//!
//! Tunes how multistate protein-design energies are turned into predicted
//! residue frequencies, so that the prediction reproduces the frequencies
//! observed in an alignment of homologous sequences.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless data: the residue alphabet,
//!   hyperparameter tuples, position indexing, target profiles, and the
//!   readers and writers for every file format involved.
//!
//! - **[`engine`]: The Logic Core.** The stateful [`engine::optimizer::Optimizer`]
//!   that caches one energy model per hyperparameter tuple, and the traits a
//!   search strategy and a similarity measure implement to drive it.
//!
//! - **[`strategies`]: Reference Collaborators.** An exhaustive grid search and
//!   two profile similarity measures.
//!
//! - **[`workflows`]: The Public API.** A single call that runs the whole
//!   pipeline from an [`engine::config::OptimizationConfig`].

pub mod core;
pub mod engine;
pub mod strategies;
pub mod workflows;
