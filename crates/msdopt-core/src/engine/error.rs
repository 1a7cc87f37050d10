use thiserror::Error;

use crate::core::io::energy_table::TableError;
use crate::core::io::fasta::FastaError;
use crate::core::macrostates::MacrostateSetError;
use crate::core::positions::{PositionIndexError, ReindexError};
use crate::core::profile::ProfileError;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Lookup failed: {0}")]
    Lookup(String),

    #[error("Failed to parse energy table: {source}")]
    Parse {
        #[from]
        source: TableError,
    },

    #[error("Failed to read alignment: {source}")]
    Alignment {
        #[from]
        source: FastaError,
    },

    #[error("Failed to read position reindex file: {source}")]
    Reindex {
        #[from]
        source: ReindexError,
    },

    #[error("Degenerate target profile: {source}")]
    Data {
        #[from]
        source: ProfileError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search strategy '{strategy}' failed: {reason}")]
    Search { strategy: String, reason: String },
}

impl From<PositionIndexError> for OptimizerError {
    fn from(err: PositionIndexError) -> Self {
        match err {
            PositionIndexError::UnknownPosition(_) => Self::Lookup(err.to_string()),
            PositionIndexError::AlreadyBuilt | PositionIndexError::NotBuilt => {
                Self::Configuration(err.to_string())
            }
        }
    }
}

impl From<MacrostateSetError> for OptimizerError {
    fn from(err: MacrostateSetError) -> Self {
        Self::Configuration(err.to_string())
    }
}
