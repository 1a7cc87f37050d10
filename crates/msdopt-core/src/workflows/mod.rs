//! # Workflows Module
//!
//! Top-level entry points that run a complete optimization from a single
//! configuration: read the target, load energies, search, and write outputs.
//!
//! - **Optimization Workflow** ([`optimize`]) - Target profile, energy ingestion,
//!   grid search and report generation as one call.

pub mod optimize;
