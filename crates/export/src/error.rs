//! Error types for export planning and writing.

use pentad_common::PentadError;
use thiserror::Error;

/// Errors raised while building, combining or writing export tables.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("CSV encoding failed: {0}")]
    Csv(String),

    #[error("Invalid sink configuration: {0}")]
    Config(String),

    #[error("Cannot combine tables: {0}")]
    Combine(String),

    #[error("Table '{table}' row for {pentad} has {actual} values, expected {expected}")]
    RowWidth {
        table: String,
        pentad: String,
        expected: usize,
        actual: usize,
    },
}

impl ExportError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<object_store::Error> for ExportError {
    fn from(err: object_store::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

impl From<ExportError> for PentadError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Config(msg) => PentadError::Config(msg),
            other => PentadError::Storage(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
