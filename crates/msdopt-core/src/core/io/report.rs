use super::fasta::with_extension_if_missing;
use crate::core::params::{BestParameters, BoltzmannMode};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Context printed alongside the winning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub algorithm: String,
    pub similarity_measure: String,
    pub elapsed: Duration,
}

/// Writes the best parameters as a human-readable report.
pub fn write_best_params(
    best: &BestParameters,
    context: &ReportContext,
    writer: &mut impl Write,
) -> io::Result<()> {
    match best.ensemble_size() {
        Some(size) => writeln!(writer, "Ensemble Size: {}", size)?,
        None => writeln!(writer, "Ensemble Size: all")?,
    }
    writeln!(writer, "Backrub temperature: {:.1}", best.backrub_temp())?;
    match best.boltzmann() {
        Some(BoltzmannMode::Temperature(t)) => {
            writeln!(writer, "Boltzmann averaging temperature: {:.9}", t)?
        }
        Some(mode) => writeln!(writer, "Boltzmann averaging temperature: {}", mode)?,
        None => writeln!(writer, "Boltzmann averaging temperature: n/a")?,
    }
    writeln!(writer, "Steepness: {:.9}", best.steepness())?;
    let weights: Vec<String> = best.weights().iter().map(|w| format!("{:.4}", w)).collect();
    writeln!(writer, "Weights: {}", weights.join(" "))?;
    writeln!(writer, "Match: {:.4}", best.match_score)?;
    writeln!(writer, "Algorithm: {}", context.algorithm)?;
    writeln!(writer, "Similarity measure: {}", context.similarity_measure)?;
    writeln!(writer, "Elapsed time: {:.3?}", context.elapsed)?;
    Ok(())
}

/// File variant of [`write_best_params`]; a `.txt` extension is appended when
/// missing and an existing file is overwritten.
pub fn write_best_params_to_path(
    best: &BestParameters,
    context: &ReportContext,
    path: &Path,
) -> io::Result<PathBuf> {
    let path = with_extension_if_missing(path, "txt");
    let mut writer = BufWriter::new(File::create(&path)?);
    write_best_params(best, context, &mut writer)?;
    writer.flush()?;
    Ok(path)
}
