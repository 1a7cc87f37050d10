//! Readers and writers for the text formats the optimizer consumes and produces.
//!
//! Alignments and exported profiles use FASTA ([`fasta`]); simulated energies
//! arrive as tab-delimited macrostate or microstate tables whose last column
//! is a residue -> energy mapping ([`energy_table`], [`literal`]); the winning
//! parameters are written as a plain-text report ([`report`]).

pub mod energy_table;
pub mod fasta;
pub mod literal;
pub mod report;
