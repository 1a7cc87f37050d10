use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PositionIndexError {
    #[error("Position index has already been built")]
    AlreadyBuilt,
    #[error("Position index has not been built yet")]
    NotBuilt,
    #[error("Position {0} is not registered in the position index")]
    UnknownPosition(i64),
}

/// Maps sequence positions (as numbered by the energy data) to compact,
/// zero-based indices, for position sets that need not be contiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    positions: Vec<i64>,
    ranks: HashMap<i64, usize>,
    built: bool,
}

impl PositionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for `new` followed by a single `build`.
    pub fn from_positions(positions: impl IntoIterator<Item = i64>) -> Self {
        let mut index = Self::new();
        index.populate(positions);
        index
    }

    /// Registers positions in order. Repeated positions keep their first rank.
    pub fn build(
        &mut self,
        positions: impl IntoIterator<Item = i64>,
    ) -> Result<(), PositionIndexError> {
        if self.built {
            return Err(PositionIndexError::AlreadyBuilt);
        }
        self.populate(positions);
        Ok(())
    }

    fn populate(&mut self, positions: impl IntoIterator<Item = i64>) {
        for position in positions {
            if !self.ranks.contains_key(&position) {
                self.ranks.insert(position, self.positions.len());
                self.positions.push(position);
            }
        }
        self.built = true;
    }

    pub fn compact_index_of(&self, position: i64) -> Result<usize, PositionIndexError> {
        if !self.built {
            return Err(PositionIndexError::NotBuilt);
        }
        self.ranks
            .get(&position)
            .copied()
            .ok_or(PositionIndexError::UnknownPosition(position))
    }

    pub fn aligned_position_of(&self, compact_index: usize) -> Option<i64> {
        self.positions.get(compact_index).copied()
    }

    pub fn contains(&self, position: i64) -> bool {
        self.ranks.contains_key(&position)
    }

    pub fn positions(&self) -> &[i64] {
        &self.positions
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Reindex parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Reindex file contains no entries")]
    Empty,
}

/// One line of a reindex file: an alignment column paired with the sequence
/// position the energy data uses for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexEntry {
    pub alignment_column: usize,
    pub sequence_position: i64,
}

/// The subset of alignment columns to optimize against, and how they are
/// numbered in the energy tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionFilter {
    entries: Vec<ReindexEntry>,
}

impl PositionFilter {
    pub fn new(entries: Vec<ReindexEntry>) -> Self {
        Self { entries }
    }

    /// Reads whitespace-separated triples `alignment_column _ sequence_position`.
    /// The middle column is ignored; blank lines are skipped.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, ReindexError> {
        let mut entries = Vec::new();
        for (line_num, line_res) in reader.lines().enumerate() {
            let line_num = line_num + 1;
            let line = line_res.map_err(|e| ReindexError::Io {
                path: "<reader>".to_string(),
                source: e,
            })?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err(ReindexError::Parse {
                    line: line_num,
                    message: format!("expected 3 columns, found {}", fields.len()),
                });
            }
            let alignment_column = fields[0].parse().map_err(|_| ReindexError::Parse {
                line: line_num,
                message: format!("invalid alignment index '{}'", fields[0]),
            })?;
            let sequence_position = fields[2].parse().map_err(|_| ReindexError::Parse {
                line: line_num,
                message: format!("invalid sequence position '{}'", fields[2]),
            })?;
            entries.push(ReindexEntry {
                alignment_column,
                sequence_position,
            });
        }
        if entries.is_empty() {
            return Err(ReindexError::Empty);
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, ReindexError> {
        let file = File::open(path).map_err(|e| ReindexError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::read_from(&mut BufReader::new(file)).map_err(|e| match e {
            ReindexError::Io { source, .. } => ReindexError::Io {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn entries(&self) -> &[ReindexEntry] {
        &self.entries
    }

    pub fn alignment_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|e| e.alignment_column)
    }

    pub fn sequence_positions(&self) -> impl Iterator<Item = i64> + '_ {
        self.entries.iter().map(|e| e.sequence_position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
