use crate::core::profile::FrequencyMatrix;
use crate::core::residues::{CANONICAL_CODES, RESIDUE_COUNT};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Sequence data on line {line} appears before any '>' header")]
    MissingHeader { line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: String,
}

/// Reads every record of a FASTA alignment. Sequence lines are concatenated
/// with surrounding whitespace removed; blank lines are ignored.
pub fn read_records(reader: &mut impl BufRead) -> Result<Vec<FastaRecord>, FastaError> {
    let mut records: Vec<FastaRecord> = Vec::new();
    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(header) = trimmed.strip_prefix('>') {
            records.push(FastaRecord {
                header: header.trim().to_string(),
                sequence: String::new(),
            });
            continue;
        }
        match records.last_mut() {
            Some(record) => record.sequence.push_str(trimmed),
            None => return Err(FastaError::MissingHeader { line: line_num + 1 }),
        }
    }
    Ok(records)
}

pub fn read_records_from_path(path: &Path) -> Result<Vec<FastaRecord>, FastaError> {
    let file = File::open(path)?;
    read_records(&mut BufReader::new(file))
}

/// Largest precision [`write_frequencies`] accepts; `10^MAX_PRECISION`
/// sequences are written at that setting.
pub const MAX_PRECISION: u32 = 6;

/// Writes a frequency profile as a pseudo-alignment.
///
/// Each row is scaled to `10^precision` observations and rounded; the output
/// then holds `10^precision` sequences whose column composition reproduces the
/// rounded counts, residues emitted in canonical order. Rows whose rounded
/// counts fall short are padded with the last canonical residue.
pub fn write_frequencies(
    frequencies: &FrequencyMatrix,
    precision: u32,
    writer: &mut impl Write,
) -> io::Result<()> {
    check_precision(precision)?;
    let n_entries = 10_i64.pow(precision);
    let n_positions = frequencies.nrows();
    let mut remaining: Vec<[i64; RESIDUE_COUNT]> = (0..n_positions)
        .map(|p| {
            let mut row = [0_i64; RESIDUE_COUNT];
            for (r, slot) in row.iter_mut().enumerate() {
                *slot = (frequencies[(p, r)] * n_entries as f64).round() as i64;
            }
            row
        })
        .collect();
    let mut cursor = vec![0_usize; n_positions];

    let mut line = String::with_capacity(n_positions);
    for _ in 0..n_entries {
        writeln!(writer, "> Null")?;
        line.clear();
        for (p, counts) in remaining.iter_mut().enumerate() {
            while counts[cursor[p]] <= 0 && cursor[p] < RESIDUE_COUNT - 1 {
                cursor[p] += 1;
            }
            counts[cursor[p]] -= 1;
            line.push(CANONICAL_CODES[cursor[p]]);
        }
        writeln!(writer, "{}", line)?;
    }
    Ok(())
}

fn check_precision(precision: u32) -> io::Result<()> {
    if precision > MAX_PRECISION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "precision {} exceeds the maximum of {}",
                precision, MAX_PRECISION
            ),
        ));
    }
    Ok(())
}

/// File variant of [`write_frequencies`]; a `.fasta` extension is appended
/// when missing. Returns the path actually written.
pub fn write_frequencies_to_path(
    frequencies: &FrequencyMatrix,
    precision: u32,
    path: &Path,
) -> io::Result<PathBuf> {
    check_precision(precision)?;
    let path = with_extension_if_missing(path, "fasta");
    let mut writer = BufWriter::new(File::create(&path)?);
    write_frequencies(frequencies, precision, &mut writer)?;
    writer.flush()?;
    Ok(path)
}

pub(crate) fn with_extension_if_missing(path: &Path, extension: &str) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == extension) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }
}
