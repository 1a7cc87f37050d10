use super::io::fasta::FastaRecord;
use super::positions::PositionFilter;
use super::residues::{RESIDUE_COUNT, residue_index};
use nalgebra::DMatrix;
use thiserror::Error;

/// A (positions x 20) matrix of residue frequencies, columns in canonical
/// residue order.
pub type FrequencyMatrix = DMatrix<f64>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ProfileError {
    #[error("Alignment contains no sequences")]
    EmptyAlignment,
    #[error("First alignment entry is empty, cannot determine the number of positions")]
    ZeroWidth,
    #[error("Alignment column {column} has no residue observations")]
    NoObservations { column: usize },
    #[error("Position filter selects column {column}, but the alignment has {width} columns")]
    ColumnOutOfRange { column: usize, width: usize },
}

/// The empirical residue distribution at each optimized position.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfile {
    frequencies: FrequencyMatrix,
    observations: Vec<usize>,
}

impl TargetProfile {
    /// Counts canonical residues column by column and normalizes each column
    /// by its number of residue observations.
    ///
    /// The alignment width is taken from the first sequence. Gaps and any
    /// non-canonical symbol are not observations; sequences shorter than the
    /// width contribute nothing to the missing columns. With a `filter`, only
    /// the listed columns are kept, in filter order.
    pub fn from_alignment<S: AsRef<str>>(
        sequences: &[S],
        filter: Option<&PositionFilter>,
    ) -> Result<Self, ProfileError> {
        let first = sequences.first().ok_or(ProfileError::EmptyAlignment)?;
        let width = first.as_ref().chars().count();
        if width == 0 {
            return Err(ProfileError::ZeroWidth);
        }

        let columns: Vec<usize> = match filter {
            Some(filter) => {
                let columns: Vec<usize> = filter.alignment_columns().collect();
                if let Some(&column) = columns.iter().find(|&&c| c >= width) {
                    return Err(ProfileError::ColumnOutOfRange { column, width });
                }
                columns
            }
            None => (0..width).collect(),
        };

        let mut counts = vec![[0_usize; RESIDUE_COUNT]; width];
        for sequence in sequences {
            for (column, code) in sequence.as_ref().chars().take(width).enumerate() {
                if let Some(residue) = residue_index(code) {
                    counts[column][residue] += 1;
                }
            }
        }

        let mut frequencies = FrequencyMatrix::zeros(columns.len(), RESIDUE_COUNT);
        let mut observations = Vec::with_capacity(columns.len());
        for (row, &column) in columns.iter().enumerate() {
            let total: usize = counts[column].iter().sum();
            if total == 0 {
                return Err(ProfileError::NoObservations { column });
            }
            for (residue, &count) in counts[column].iter().enumerate() {
                frequencies[(row, residue)] = count as f64 / total as f64;
            }
            observations.push(total);
        }

        Ok(Self {
            frequencies,
            observations,
        })
    }

    pub fn from_records(
        records: &[FastaRecord],
        filter: Option<&PositionFilter>,
    ) -> Result<Self, ProfileError> {
        let sequences: Vec<&str> = records.iter().map(|r| r.sequence.as_str()).collect();
        Self::from_alignment(&sequences, filter)
    }

    pub fn n_positions(&self) -> usize {
        self.frequencies.nrows()
    }

    pub fn frequencies(&self) -> &FrequencyMatrix {
        &self.frequencies
    }

    pub fn frequency(&self, position: usize, residue: usize) -> Option<f64> {
        self.frequencies.get((position, residue)).copied()
    }

    /// Number of residue (non-gap) observations behind a row.
    pub fn observations(&self, position: usize) -> Option<usize> {
        self.observations.get(position).copied()
    }

    pub fn into_frequencies(self) -> FrequencyMatrix {
        self.frequencies
    }
}
