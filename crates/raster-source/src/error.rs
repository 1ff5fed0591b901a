//! Error types for raster access.

use thiserror::Error;

/// Errors that can occur while opening, reading or compositing rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open the raster store.
    #[error("failed to open raster: {0}")]
    OpenFailed(String),

    /// Failed to read pixel data.
    #[error("failed to read raster data: {0}")]
    ReadFailed(String),

    /// Invalid or missing raster attributes.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    /// Requested band does not exist on the raster.
    #[error("band '{band}' not found (available: {available:?})")]
    UnknownBand { band: String, available: Vec<String> },

    /// Requested window lies outside the raster.
    #[error("window {requested} is outside raster of {width}x{height} pixels")]
    OutOfBounds {
        requested: String,
        width: usize,
        height: usize,
    },

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Scenes cannot be combined into a composite.
    #[error("composite error: {0}")]
    Composite(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RasterError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a Storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a Composite error.
    pub fn composite(msg: impl Into<String>) -> Self {
        Self::Composite(msg.into())
    }
}

impl From<std::io::Error> for RasterError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for RasterError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
