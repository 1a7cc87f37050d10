use super::literal::{LiteralError, parse_energy_literal};
use crate::core::macrostates::MacrostateSet;
use crate::core::params::{BoltzmannMode, HyperParams, ParamsError};
use crate::core::residues::RESIDUE_COUNT;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to read table record near line {line}: {source}")]
    Csv { line: u64, source: csv::Error },
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: u64, kind: RecordErrorKind },
}

#[derive(Debug, Error, PartialEq, Clone)]
pub enum RecordErrorKind {
    #[error("expected at least {expected} tab-separated fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("unknown macrostate '{0}'")]
    UnknownMacrostate(String),
    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid Boltzmann temperature: {0}")]
    InvalidBoltzmann(#[from] ParamsError),
    #[error("malformed energy literal: {0}")]
    Literal(#[from] LiteralError),
}

/// One row of a macrostate table: energies already averaged over an
/// ensemble with the listed settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MacrostateRecord {
    pub line: u64,
    pub macrostate: usize,
    pub params: HyperParams,
    pub position: i64,
    pub energies: [f64; RESIDUE_COUNT],
}

/// One row of a microstate table: energies of a single sampled backbone.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrostateRecord {
    pub line: u64,
    pub macrostate: usize,
    pub backrub_temp: f64,
    pub position: i64,
    pub backbone: String,
    pub energies: [f64; RESIDUE_COUNT],
}

const MACROSTATE_FIELDS: usize = 6;
const MICROSTATE_FIELDS: usize = 5;

/// Parses a tab-delimited macrostate table with one header line. Columns:
/// `macrostate, backrub_temp, ensemble_size, boltzmann_temp, position, energies`.
///
/// Parsing is strict: the first malformed row aborts the read.
pub fn read_macrostate_table(
    reader: impl Read,
    macrostates: &MacrostateSet,
) -> Result<Vec<MacrostateRecord>, TableError> {
    let mut records = Vec::new();
    for_each_row(reader, MACROSTATE_FIELDS, |line, row| {
        let macrostate = parse_macrostate(&row[0], macrostates)?;
        let backrub_temp = parse_float(&row[1], "backrub temperature")?;
        let ensemble_size = row[2]
            .parse::<u32>()
            .map_err(|_| RecordErrorKind::InvalidNumber {
                field: "ensemble size",
                value: row[2].to_string(),
            })?;
        let boltzmann: BoltzmannMode = row[3].parse()?;
        let position = parse_position(&row[4])?;
        let energies = parse_energy_literal(&row[5])?;

        records.push(MacrostateRecord {
            line,
            macrostate,
            params: HyperParams::macrostate(backrub_temp, ensemble_size, boltzmann),
            position,
            energies,
        });
        Ok(())
    })?;
    Ok(records)
}

/// Parses a tab-delimited microstate table with one header line. Columns:
/// `macrostate, backrub_temp, position, backbone_id, energies`.
pub fn read_microstate_table(
    reader: impl Read,
    macrostates: &MacrostateSet,
) -> Result<Vec<MicrostateRecord>, TableError> {
    let mut records = Vec::new();
    for_each_row(reader, MICROSTATE_FIELDS, |line, row| {
        let macrostate = parse_macrostate(&row[0], macrostates)?;
        let backrub_temp = parse_float(&row[1], "backrub temperature")?;
        let position = parse_position(&row[2])?;
        let energies = parse_energy_literal(&row[4])?;

        records.push(MicrostateRecord {
            line,
            macrostate,
            backrub_temp,
            position,
            backbone: row[3].to_string(),
            energies,
        });
        Ok(())
    })?;
    Ok(records)
}

pub fn load_macrostate_table(
    path: &Path,
    macrostates: &MacrostateSet,
) -> Result<Vec<MacrostateRecord>, TableError> {
    read_macrostate_table(open(path)?, macrostates)
}

pub fn load_microstate_table(
    path: &Path,
    macrostates: &MacrostateSet,
) -> Result<Vec<MicrostateRecord>, TableError> {
    read_microstate_table(open(path)?, macrostates)
}

fn open(path: &Path) -> Result<File, TableError> {
    File::open(path).map_err(|e| TableError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn for_each_row<F>(reader: impl Read, min_fields: usize, mut handle: F) -> Result<(), TableError>
where
    F: FnMut(u64, &StringRecord) -> Result<(), RecordErrorKind>,
{
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut row = StringRecord::new();
    loop {
        let line = reader.position().line();
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(source) => return Err(TableError::Csv { line, source }),
        }
        let line = row.position().map_or(line, |p| p.line());
        if row.len() < min_fields {
            return Err(TableError::Parse {
                line,
                kind: RecordErrorKind::TooFewFields {
                    expected: min_fields,
                    found: row.len(),
                },
            });
        }
        handle(line, &row).map_err(|kind| TableError::Parse { line, kind })?;
    }
    Ok(())
}

fn parse_macrostate(token: &str, macrostates: &MacrostateSet) -> Result<usize, RecordErrorKind> {
    macrostates
        .index_of(token)
        .ok_or_else(|| RecordErrorKind::UnknownMacrostate(token.to_string()))
}

fn parse_float(token: &str, field: &'static str) -> Result<f64, RecordErrorKind> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordErrorKind::InvalidNumber {
            field,
            value: token.to_string(),
        })
}

fn parse_position(token: &str) -> Result<i64, RecordErrorKind> {
    token.parse().map_err(|_| RecordErrorKind::InvalidNumber {
        field: "position",
        value: token.to_string(),
    })
}
