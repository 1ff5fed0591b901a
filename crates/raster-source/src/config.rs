//! Configuration for raster reading and writing.

use serde::{Deserialize, Serialize};

/// Configuration for raster access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    /// Memory budget for the chunk cache in megabytes.
    pub chunk_cache_size_mb: usize,

    /// Chunk dimension for written Zarr arrays (square chunks).
    pub zarr_chunk_size: usize,

    /// Compression codec for written Zarr arrays.
    pub zarr_compression: ZarrCompression,

    /// Compression level (1-9).
    pub zarr_compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub zarr_shuffle: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            chunk_cache_size_mb: 256,
            zarr_chunk_size: 256,
            zarr_compression: ZarrCompression::BloscZstd,
            zarr_compression_level: 1,
            zarr_shuffle: true,
        }
    }
}

impl RasterConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_cache_size_mb == 0 {
            return Err("chunk_cache_size_mb must be > 0".to_string());
        }

        if self.zarr_chunk_size == 0 {
            return Err("zarr_chunk_size must be > 0".to_string());
        }

        if self.zarr_compression_level == 0 || self.zarr_compression_level > 9 {
            return Err("zarr_compression_level must be 1-9".to_string());
        }

        Ok(())
    }

    /// Chunk cache size in bytes.
    pub fn chunk_cache_size_bytes(&self) -> usize {
        self.chunk_cache_size_mb * 1024 * 1024
    }
}

/// Compression codec for written Zarr arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = RasterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_cache_size_bytes(), 256 * 1024 * 1024);
    }

    #[test]
    fn test_validate_rejects_zero_cache() {
        let config = RasterConfig {
            chunk_cache_size_mb: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_yaml_like_json() {
        let config: RasterConfig =
            serde_json::from_str(r#"{"chunk_cache_size_mb": 64}"#).unwrap();
        assert_eq!(config.chunk_cache_size_mb, 64);
        assert_eq!(config.zarr_chunk_size, 256);
    }
}
