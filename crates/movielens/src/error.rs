//! Error types for the movielens crate.

use thiserror::Error;

/// Errors that can occur while loading a MovieLens 100K directory
#[derive(Error, Debug)]
pub enum DatasetError {
    /// I/O error occurred while reading a data file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line in a data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    /// A rating referenced an item id absent from u.item
    #[error("Rating references unknown item id {id}")]
    UnknownItem { id: u32 },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DatasetError>;
