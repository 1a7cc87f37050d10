//! # Engine Module
//!
//! The stateful layer: cached energy models, the optimizer that owns them, and
//! the seams through which a search strategy and a similarity measure plug in.
//!
//! ## Overview
//!
//! An [`optimizer::Optimizer`] reads a target profile, ingests an energy table
//! into one [`model::Model`] per hyperparameter tuple, and answers frequency
//! and scoring queries for arbitrary candidates. Search strategies only ever
//! see the optimizer through shared references, so candidate evaluation can
//! run in parallel.
//!
//! - **Models** ([`model`]) - Per-tuple energy storage and the softmin frequency transform
//! - **Cache** ([`cache`]) - Models keyed by parameter id
//! - **Optimizer** ([`optimizer`]) - Loading, lookup, scoring and search dispatch
//! - **Search seams** ([`search`]) - The strategy and similarity traits
//! - **Configuration** ([`config`]) - Run settings and the search grid
//! - **Progress Monitoring** ([`progress`]) - Progress callbacks for front ends
//! - **Error Handling** ([`error`]) - The optimizer error taxonomy

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod optimizer;
pub mod progress;
pub mod search;
