use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of canonical amino-acid residue types tracked per position.
pub const RESIDUE_COUNT: usize = 20;

/// One-letter codes in the canonical (alphabetical) column order used by every
/// energy vector and frequency row in the crate.
pub const CANONICAL_CODES: [char; RESIDUE_COUNT] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V',
    'W', 'Y',
];

static ONE_LETTER_INDEX: Map<char, usize> = phf_map! {
    'A' => 0, 'C' => 1, 'D' => 2, 'E' => 3, 'F' => 4,
    'G' => 5, 'H' => 6, 'I' => 7, 'K' => 8, 'L' => 9,
    'M' => 10, 'N' => 11, 'P' => 12, 'Q' => 13, 'R' => 14,
    'S' => 15, 'T' => 16, 'V' => 17, 'W' => 18, 'Y' => 19,
};

/// The twenty canonical amino acids, declared in canonical column order so that
/// `residue as usize` is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AminoAcid {
    Alanine,
    Cysteine,
    AsparticAcid,
    GlutamicAcid,
    Phenylalanine,
    Glycine,
    Histidine,
    Isoleucine,
    Lysine,
    Leucine,
    Methionine,
    Asparagine,
    Proline,
    Glutamine,
    Arginine,
    Serine,
    Threonine,
    Valine,
    Tryptophan,
    Tyrosine,
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("'{0}' is not a canonical amino-acid code")]
pub struct UnknownResidueError(pub String);

impl AminoAcid {
    pub const ALL: [AminoAcid; RESIDUE_COUNT] = [
        AminoAcid::Alanine,
        AminoAcid::Cysteine,
        AminoAcid::AsparticAcid,
        AminoAcid::GlutamicAcid,
        AminoAcid::Phenylalanine,
        AminoAcid::Glycine,
        AminoAcid::Histidine,
        AminoAcid::Isoleucine,
        AminoAcid::Lysine,
        AminoAcid::Leucine,
        AminoAcid::Methionine,
        AminoAcid::Asparagine,
        AminoAcid::Proline,
        AminoAcid::Glutamine,
        AminoAcid::Arginine,
        AminoAcid::Serine,
        AminoAcid::Threonine,
        AminoAcid::Valine,
        AminoAcid::Tryptophan,
        AminoAcid::Tyrosine,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn code(self) -> char {
        CANONICAL_CODES[self.index()]
    }

    /// Looks up a one-letter code. Lowercase letters, gaps and ambiguity codes
    /// (`X`, `B`, `Z`, ...) are not canonical and yield `None`.
    pub fn from_code(code: char) -> Option<Self> {
        residue_index(code).map(|i| Self::ALL[i])
    }
}

/// Column index of a one-letter residue code, or `None` for anything outside
/// the canonical twenty.
#[inline]
pub fn residue_index(code: char) -> Option<usize> {
    ONE_LETTER_INDEX.get(&code).copied()
}

impl FromStr for AminoAcid {
    type Err = UnknownResidueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let residue = match (chars.next(), chars.next()) {
            (Some(code), None) => Self::from_code(code),
            _ => None,
        };
        residue.ok_or_else(|| UnknownResidueError(s.to_string()))
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
