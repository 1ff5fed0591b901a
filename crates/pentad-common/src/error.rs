//! Error types for pentad-covariates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using PentadError.
pub type PentadResult<T> = Result<T, PentadError>;

/// Primary error type for grid loading, aggregation and export.
#[derive(Debug, Clone, Error)]
pub enum PentadError {
    // === Configuration Errors ===
    #[error("Malformed grid record at line {line} (pentad {pentad:?}): {reason}")]
    MalformedGridRecord {
        line: usize,
        pentad: Option<String>,
        reason: String,
    },

    #[error("Unknown band '{band}' on source '{source_name}' (available: {available:?})")]
    UnknownBand {
        source_name: String,
        band: String,
        available: Vec<String>,
    },

    #[error("Invalid catalog entry '{source_name}': {reason}")]
    InvalidCatalogEntry { source_name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // === Per-cell Errors ===
    #[error("Pentad {pentad} on source '{source_name}' needs {required} samples, limit is {max_pixels}")]
    ResourceLimitExceeded {
        pentad: String,
        source_name: String,
        required: u64,
        max_pixels: u64,
    },

    #[error("Sampling failed for pentad {pentad} on source '{source_name}': {message}")]
    SamplingFailure {
        pentad: String,
        source_name: String,
        message: String,
    },

    #[error("Pentad {pentad} on source '{source_name}' timed out after {after_ms}ms")]
    Timeout {
        pentad: String,
        source_name: String,
        after_ms: u64,
    },

    // === Infrastructure Errors ===
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PentadError {
    /// Coarse classification used for run summaries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PentadError::MalformedGridRecord { .. } => ErrorKind::MalformedGridRecord,
            PentadError::UnknownBand { .. } => ErrorKind::UnknownBand,
            PentadError::InvalidCatalogEntry { .. } => ErrorKind::InvalidCatalogEntry,
            PentadError::Config(_) => ErrorKind::Config,
            PentadError::ResourceLimitExceeded { .. } => ErrorKind::ResourceLimitExceeded,
            PentadError::SamplingFailure { .. } => ErrorKind::SamplingFailure,
            PentadError::Timeout { .. } => ErrorKind::Timeout,
            PentadError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether this error only degrades a single cell of a source.
    pub fn is_cell_level(&self) -> bool {
        self.kind().is_cell_level()
    }
}

/// Classification of [`PentadError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MalformedGridRecord,
    UnknownBand,
    InvalidCatalogEntry,
    Config,
    ResourceLimitExceeded,
    SamplingFailure,
    Timeout,
    Storage,
}

impl ErrorKind {
    pub fn is_cell_level(&self) -> bool {
        matches!(
            self,
            ErrorKind::ResourceLimitExceeded | ErrorKind::SamplingFailure | ErrorKind::Timeout
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedGridRecord => "malformed_grid_record",
            ErrorKind::UnknownBand => "unknown_band",
            ErrorKind::InvalidCatalogEntry => "invalid_catalog_entry",
            ErrorKind::Config => "config",
            ErrorKind::ResourceLimitExceeded => "resource_limit_exceeded",
            ErrorKind::SamplingFailure => "sampling_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Storage => "storage",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<std::io::Error> for PentadError {
    fn from(err: std::io::Error) -> Self {
        PentadError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_level_kinds() {
        let err = PentadError::Timeout {
            pentad: "2930_2500".to_string(),
            source_name: "NASADEM".to_string(),
            after_ms: 500,
        };
        assert!(err.is_cell_level());

        let err = PentadError::UnknownBand {
            source_name: "MOD13A2".to_string(),
            band: "NDWI".to_string(),
            available: vec!["NDVI".to_string(), "EVI".to_string()],
        };
        assert!(!err.is_cell_level());
        assert_eq!(err.kind(), ErrorKind::UnknownBand);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ResourceLimitExceeded).unwrap();
        assert_eq!(json, "\"resource_limit_exceeded\"");
        assert_eq!(ErrorKind::ResourceLimitExceeded.to_string(), "resource_limit_exceeded");
    }
}
