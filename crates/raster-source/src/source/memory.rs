//! Raster held entirely in memory.
//!
//! Used for temporal composites and for tests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pentad_common::BoundingBox;

use crate::error::{RasterError, Result};
use crate::types::{CoordinateUnits, PixelWindow, RasterMetadata, RasterWindow};

use super::{check_request, RasterSource};

/// A raster whose bands are plain row-major `Vec<f32>` buffers.
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    metadata: RasterMetadata,
    bands: Vec<Vec<f32>>,
}

impl InMemoryRaster {
    /// Create an empty geographic raster with a NaN fill value.
    pub fn new(name: impl Into<String>, extent: BoundingBox, shape: (usize, usize)) -> Self {
        Self {
            metadata: RasterMetadata {
                name: name.into(),
                extent,
                shape,
                bands: Vec::new(),
                fill_value: f32::NAN,
                units: CoordinateUnits::Degrees,
                acquired: None,
                properties: BTreeMap::new(),
            },
            bands: Vec::new(),
        }
    }

    /// Build from metadata and per-band data in band order.
    pub fn from_parts(metadata: RasterMetadata, bands: Vec<Vec<f32>>) -> Result<Self> {
        if metadata.bands.len() != bands.len() {
            return Err(RasterError::invalid_metadata(format!(
                "{} band names for {} band buffers",
                metadata.bands.len(),
                bands.len()
            )));
        }
        let mut raster = Self {
            metadata,
            bands: Vec::with_capacity(bands.len()),
        };
        for data in bands {
            raster.check_len(&data)?;
            raster.bands.push(data);
        }
        Ok(raster)
    }

    /// Append a band.
    pub fn add_band(&mut self, name: impl Into<String>, data: Vec<f32>) -> Result<()> {
        let name = name.into();
        if self.metadata.has_band(&name) {
            return Err(RasterError::invalid_metadata(format!(
                "duplicate band '{}'",
                name
            )));
        }
        self.check_len(&data)?;
        self.metadata.bands.push(name);
        self.bands.push(data);
        Ok(())
    }

    pub fn with_band(mut self, name: impl Into<String>, data: Vec<f32>) -> Result<Self> {
        self.add_band(name, data)?;
        Ok(self)
    }

    pub fn with_fill_value(mut self, fill_value: f32) -> Self {
        self.metadata.fill_value = fill_value;
        self
    }

    pub fn with_units(mut self, units: CoordinateUnits) -> Self {
        self.metadata.units = units;
        self
    }

    pub fn with_acquired(mut self, acquired: DateTime<Utc>) -> Self {
        self.metadata.acquired = Some(acquired);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.properties.insert(key.into(), value.into());
        self
    }

    /// Band buffers in band order.
    pub fn bands(&self) -> &[Vec<f32>] {
        &self.bands
    }

    fn check_len(&self, data: &[f32]) -> Result<()> {
        let expected = self.metadata.pixel_count();
        if data.len() != expected {
            return Err(RasterError::invalid_metadata(format!(
                "band has {} values, raster of {}x{} needs {}",
                data.len(),
                self.metadata.shape.0,
                self.metadata.shape.1,
                expected
            )));
        }
        Ok(())
    }
}

impl RasterSource for InMemoryRaster {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_window(&self, band: &str, window: &PixelWindow) -> Result<RasterWindow> {
        let index = check_request(&self.metadata, band, window)?;
        let source = &self.bands[index];
        let width = self.metadata.shape.0;

        let mut data = Vec::with_capacity(window.len());
        for row in window.row0..window.row_end() {
            let start = row * width + window.col0;
            data.extend_from_slice(&source[start..start + window.width]);
        }

        Ok(RasterWindow::new(*window, data))
    }

    fn read_band(&self, band: &str) -> Result<Vec<f32>> {
        let (width, height) = self.metadata.shape;
        let index = check_request(&self.metadata, band, &PixelWindow::new(0, 0, width, height))?;
        Ok(self.bands[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster() -> InMemoryRaster {
        // 3x2 raster, value = row * 10 + col
        InMemoryRaster::new("mem", BoundingBox::new(0.0, 0.0, 3.0, 2.0), (3, 2))
            .with_band("b1", vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0])
            .unwrap()
    }

    #[test]
    fn test_read_window() {
        let raster = raster();
        let window = raster
            .read_window("b1", &PixelWindow::new(1, 0, 2, 2))
            .unwrap();
        assert_eq!(window.data, vec![1.0, 2.0, 11.0, 12.0]);
        assert_eq!(window.get(2, 1), Some(12.0));
        assert_eq!(window.get(0, 0), None);
    }

    #[test]
    fn test_unknown_band() {
        let raster = raster();
        let err = raster
            .read_window("b2", &PixelWindow::new(0, 0, 1, 1))
            .unwrap_err();
        assert!(matches!(err, RasterError::UnknownBand { .. }));
    }

    #[test]
    fn test_window_out_of_bounds() {
        let raster = raster();
        let err = raster
            .read_window("b1", &PixelWindow::new(2, 0, 2, 1))
            .unwrap_err();
        assert!(matches!(err, RasterError::OutOfBounds { .. }));
    }

    #[test]
    fn test_band_length_checked() {
        let result = InMemoryRaster::new("mem", BoundingBox::new(0.0, 0.0, 3.0, 2.0), (3, 2))
            .with_band("b1", vec![0.0; 5]);
        assert!(result.is_err());
    }
}
