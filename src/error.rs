use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a load. Every variant is fatal for the whole import.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("source not found at {}", path.display())]
    SourceMissing { path: PathBuf },

    #[error("CSV entry {entry:?} not found in {}", archive.display())]
    EntryMissing { archive: PathBuf, entry: String },

    #[error("unsupported source {} (expected .zip or .csv)", path.display())]
    UnsupportedSource { path: PathBuf },

    #[error("row {row}: {column} is not a valid integer: {value:?}")]
    InvalidInteger {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: {column} is not a valid number: {value:?}")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: {column} must not be negative: {value:?}")]
    Negative {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised while serving filter vocabularies and record queries.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Missing or malformed request parameter. Raised before the store is touched.
    #[error("{0}")]
    InvalidInput(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Storage(#[from] rusqlite::Error),
}

impl QueryError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
