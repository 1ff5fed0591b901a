//! Raster source trait and implementations.

mod memory;
mod zarr;

pub use memory::InMemoryRaster;
pub use zarr::ZarrRaster;

use crate::error::{RasterError, Result};
use crate::types::{CacheStats, PixelWindow, RasterMetadata, RasterWindow};

/// Read access to a multi-band, north-up raster.
///
/// Reads are synchronous; callers that run on an async runtime are expected
/// to wrap them in `spawn_blocking`.
pub trait RasterSource: Send + Sync {
    /// Metadata for the raster (extent, shape, bands, fill value).
    fn metadata(&self) -> &RasterMetadata;

    /// Read one band over a pixel window.
    fn read_window(&self, band: &str, window: &PixelWindow) -> Result<RasterWindow>;

    /// Read a whole band.
    fn read_band(&self, band: &str) -> Result<Vec<f32>> {
        let (width, height) = self.metadata().shape;
        let window = PixelWindow::new(0, 0, width, height);
        Ok(self.read_window(band, &window)?.data)
    }

    fn has_band(&self, band: &str) -> bool {
        self.metadata().has_band(band)
    }

    /// Chunk cache statistics, if the source caches reads.
    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Check a read request against the metadata and return the band index.
pub(crate) fn check_request(
    metadata: &RasterMetadata,
    band: &str,
    window: &PixelWindow,
) -> Result<usize> {
    let index = metadata
        .band_index(band)
        .ok_or_else(|| RasterError::UnknownBand {
            band: band.to_string(),
            available: metadata.bands.clone(),
        })?;

    if !window.fits(metadata.shape) {
        return Err(RasterError::OutOfBounds {
            requested: window.to_string(),
            width: metadata.shape.0,
            height: metadata.shape.1,
        });
    }

    Ok(index)
}
