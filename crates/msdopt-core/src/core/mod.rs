//! # Core Module
//!
//! Stateless building blocks shared by the optimization engine.
//!
//! ## Overview
//!
//! Everything in this module is plain data plus the parsers that produce it:
//! nothing here owns a cache or drives a search.
//!
//! - **Residue alphabet** ([`residues`]) - The twenty canonical amino acids and their fixed order
//! - **Hyperparameters** ([`params`]) - Parameter tuples, Boltzmann modes and cache keys
//! - **Macrostates** ([`macrostates`]) - The fixed name-to-index table of simulated states
//! - **Positions** ([`positions`]) - Compact indexing of sparse positions and reindex files
//! - **Target profiles** ([`profile`]) - Residue frequencies observed in an alignment
//! - **File I/O** ([`io`]) - Energy tables, FASTA alignments and text reports

pub mod io;
pub mod macrostates;
pub mod params;
pub mod positions;
pub mod profile;
pub mod residues;
