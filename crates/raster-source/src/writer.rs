//! Zarr V3 raster writer.
//!
//! Writes rasters in the layout read by [`ZarrRaster`](crate::ZarrRaster):
//! one chunked float32 array per band, optionally Blosc-compressed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::attributes::BandAttributes;
use crate::config::{RasterConfig, ZarrCompression};
use crate::error::{RasterError, Result};
use crate::source::RasterSource;
use crate::types::RasterMetadata;

/// Result of writing one band array.
#[derive(Debug, Clone)]
pub struct BandWriteResult {
    pub band: String,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Writer for Zarr rasters.
pub struct ZarrRasterWriter {
    config: RasterConfig,
}

impl ZarrRasterWriter {
    pub fn new(config: RasterConfig) -> Self {
        Self { config }
    }

    /// Write every band of `raster` under `root`.
    pub fn write_raster(&self, root: &Path, raster: &dyn RasterSource) -> Result<Vec<BandWriteResult>> {
        let metadata = raster.metadata();
        let mut results = Vec::with_capacity(metadata.bands.len());
        for band in &metadata.bands {
            let data = raster.read_band(band)?;
            results.push(self.write_band(root, metadata, band, &data)?);
        }
        Ok(results)
    }

    /// Write one band of a raster described by `metadata`.
    ///
    /// `data` is row-major, top-to-bottom, `width * height` values.
    pub fn write_band(
        &self,
        root: &Path,
        metadata: &RasterMetadata,
        band: &str,
        data: &[f32],
    ) -> Result<BandWriteResult> {
        let band_index = metadata.band_index(band).ok_or_else(|| RasterError::UnknownBand {
            band: band.to_string(),
            available: metadata.bands.clone(),
        })?;

        let (width, height) = metadata.shape;
        if data.len() != width * height {
            return Err(RasterError::invalid_metadata(format!(
                "band '{}' has {} values, expected {}",
                band,
                data.len(),
                width * height
            )));
        }

        let dir = root.join(band);
        std::fs::create_dir_all(&dir)?;
        let store = Arc::new(
            FilesystemStore::new(&dir).map_err(|e| RasterError::storage(e.to_string()))?,
        );

        let attrs = BandAttributes {
            name: metadata.name.clone(),
            band: Some(band.to_string()),
            band_index,
            bbox: [
                metadata.extent.min_x,
                metadata.extent.min_y,
                metadata.extent.max_x,
                metadata.extent.max_y,
            ],
            units: metadata.units,
            acquired: metadata.acquired,
            properties: metadata.properties.clone(),
        };

        let array = self.build_array(store, metadata, attrs)?;
        array
            .store_metadata()
            .map_err(|e| RasterError::storage(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![0, 0], vec![height as u64, width as u64])
            .map_err(|e| RasterError::storage(e.to_string()))?;
        array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| RasterError::storage(e.to_string()))?;

        tracing::debug!(
            path = %dir.display(),
            band,
            width,
            height,
            compression = %self.config.zarr_compression,
            "Wrote band array"
        );

        Ok(BandWriteResult {
            band: band.to_string(),
            path: dir,
            bytes_written: std::mem::size_of_val(data) as u64,
        })
    }

    fn build_array(
        &self,
        store: Arc<FilesystemStore>,
        metadata: &RasterMetadata,
        attrs: BandAttributes,
    ) -> Result<Array<FilesystemStore>> {
        let (width, height) = metadata.shape;
        let chunk = self.config.zarr_chunk_size as u64;
        let chunk_grid: zarrs::array::ChunkGrid = vec![chunk, chunk]
            .try_into()
            .map_err(|e| RasterError::Config(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(
            vec![height as u64, width as u64],
            DataType::Float32,
            chunk_grid,
            FillValue::from(metadata.fill_value),
        );
        let mut builder = binding.attributes(attrs.to_map()?);

        if self.config.zarr_compression != ZarrCompression::None {
            builder = builder.bytes_to_bytes_codecs(vec![self.compression_codec()?]);
        }

        builder
            .build(store, "/")
            .map_err(|e| RasterError::storage(e.to_string()))
    }

    fn compression_codec(&self) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.zarr_compression_level)
            .map_err(|_| RasterError::Config("invalid compression level".to_string()))?;

        let (shuffle, typesize) = if self.config.zarr_shuffle {
            (BloscShuffleMode::Shuffle, Some(std::mem::size_of::<f32>()))
        } else {
            (BloscShuffleMode::NoShuffle, None)
        };

        let compressor = match self.config.zarr_compression {
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
            ZarrCompression::None => {
                return Err(RasterError::Config("no compression configured".to_string()))
            }
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| RasterError::Config(e.to_string()))?;
        Ok(Arc::new(codec))
    }
}
