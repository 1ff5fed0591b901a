//! Core types for raster access.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pentad_common::BoundingBox;
use serde::{Deserialize, Serialize};

/// Units of the raster coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateUnits {
    /// Geographic coordinates (x = longitude, y = latitude).
    #[default]
    Degrees,
    /// Projected coordinates in metres.
    Meters,
}

/// Metadata describing a north-up raster with one or more bands.
///
/// Pixel `(0, 0)` is the top-left pixel: its top edge lies on `extent.max_y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Dataset name (informational).
    pub name: String,
    /// Outer edges of the raster in coordinate units.
    pub extent: BoundingBox,
    /// Raster dimensions (width, height) in pixels.
    pub shape: (usize, usize),
    /// Band names in band order. The first band is the implicit scalar field.
    pub bands: Vec<String>,
    /// Fill/missing value.
    pub fill_value: f32,
    /// Units of `extent`.
    pub units: CoordinateUnits,
    /// Acquisition time, used to select scenes for composites.
    pub acquired: Option<DateTime<Utc>>,
    /// Free-form scene properties, used for composite filters.
    pub properties: BTreeMap<String, String>,
}

impl RasterMetadata {
    /// Pixel size in coordinate units per pixel (x, y).
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.extent.width() / self.shape.0 as f64,
            self.extent.height() / self.shape.1 as f64,
        )
    }

    /// Number of pixels in one band.
    pub fn pixel_count(&self) -> usize {
        self.shape.0 * self.shape.1
    }

    pub fn has_band(&self, band: &str) -> bool {
        self.bands.iter().any(|b| b == band)
    }

    /// Index of a band in band order.
    pub fn band_index(&self, band: &str) -> Option<usize> {
        self.bands.iter().position(|b| b == band)
    }

    /// The smallest pixel window that covers the part of `bbox` inside the raster.
    ///
    /// Returns `None` when `bbox` does not overlap the raster.
    pub fn pixel_window(&self, bbox: &BoundingBox) -> Option<PixelWindow> {
        let clipped = self.extent.intersection(bbox)?;
        let (res_x, res_y) = self.resolution();
        let (width, height) = self.shape;

        let min_col = ((clipped.min_x - self.extent.min_x) / res_x)
            .floor()
            .max(0.0) as usize;
        let max_col = ((clipped.max_x - self.extent.min_x) / res_x)
            .ceil()
            .min(width as f64) as usize;
        let min_row = ((self.extent.max_y - clipped.max_y) / res_y)
            .floor()
            .max(0.0) as usize;
        let max_row = ((self.extent.max_y - clipped.min_y) / res_y)
            .ceil()
            .min(height as f64) as usize;

        if min_col >= max_col || min_row >= max_row {
            return None;
        }

        Some(PixelWindow {
            col0: min_col,
            row0: min_row,
            width: max_col - min_col,
            height: max_row - min_row,
        })
    }

    /// The pixel containing a point, or `None` if the point is outside the raster.
    ///
    /// Points on the right or bottom outer edge belong to the last column/row.
    pub fn coords_to_cell(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !self.extent.contains_point(x, y) {
            return None;
        }

        let (res_x, res_y) = self.resolution();
        let (width, height) = self.shape;

        let col = (((x - self.extent.min_x) / res_x).floor() as usize).min(width - 1);
        let row = (((self.extent.max_y - y) / res_y).floor() as usize).min(height - 1);
        Some((col, row))
    }

    /// Whether a pixel value carries data (not NaN and not the fill value).
    pub fn is_valid(&self, value: f32) -> bool {
        !value.is_nan() && value != self.fill_value
    }

    /// Check that two rasters share extent, shape and band set.
    pub fn same_geometry(&self, other: &RasterMetadata) -> bool {
        self.shape == other.shape && self.extent == other.extent && self.bands == other.bands
    }
}

/// A rectangular window of pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col0: usize,
    pub row0: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col0: usize, row0: usize, width: usize, height: usize) -> Self {
        Self {
            col0,
            row0,
            width,
            height,
        }
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> usize {
        self.col0 + self.width
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> usize {
        self.row0 + self.height
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the window fits inside a raster of the given shape.
    pub fn fits(&self, shape: (usize, usize)) -> bool {
        self.col_end() <= shape.0 && self.row_end() <= shape.1
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        col >= self.col0 && col < self.col_end() && row >= self.row0 && row < self.row_end()
    }
}

impl std::fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[cols {}..{}, rows {}..{}]",
            self.col0,
            self.col_end(),
            self.row0,
            self.row_end()
        )
    }
}

/// Pixel values of one band over a window (row-major, top-to-bottom).
#[derive(Debug, Clone)]
pub struct RasterWindow {
    pub window: PixelWindow,
    pub data: Vec<f32>,
}

impl RasterWindow {
    pub fn new(window: PixelWindow, data: Vec<f32>) -> Self {
        Self { window, data }
    }

    /// Value at an absolute raster pixel, or `None` outside the window.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if !self.window.contains(col, row) {
            return None;
        }
        let idx = (row - self.window.row0) * self.window.width + (col - self.window.col0);
        self.data.get(idx).copied()
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Current number of entries in cache.
    pub entries: usize,
    /// Current memory usage in bytes.
    pub memory_bytes: u64,
    /// Number of evictions.
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> RasterMetadata {
        RasterMetadata {
            name: "test".to_string(),
            extent: BoundingBox::new(0.0, 0.0, 10.0, 5.0),
            shape: (10, 5),
            bands: vec!["b1".to_string()],
            fill_value: -9999.0,
            units: CoordinateUnits::Degrees,
            acquired: None,
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_pixel_window_inside() {
        let md = metadata();
        let window = md.pixel_window(&BoundingBox::new(2.5, 1.0, 4.0, 3.0)).unwrap();
        // rows counted from the top: y=3 -> row 2, y=1 -> row 4
        assert_eq!(window, PixelWindow::new(2, 2, 2, 2));
    }

    #[test]
    fn test_pixel_window_clipped_and_outside() {
        let md = metadata();
        let window = md.pixel_window(&BoundingBox::new(-5.0, -5.0, 1.0, 1.0)).unwrap();
        assert_eq!(window, PixelWindow::new(0, 4, 1, 1));

        assert!(md.pixel_window(&BoundingBox::new(20.0, 0.0, 30.0, 5.0)).is_none());
    }

    #[test]
    fn test_coords_to_cell_edges() {
        let md = metadata();
        assert_eq!(md.coords_to_cell(0.0, 5.0), Some((0, 0)));
        assert_eq!(md.coords_to_cell(10.0, 0.0), Some((9, 4)));
        assert_eq!(md.coords_to_cell(10.5, 0.0), None);
    }

    #[test]
    fn test_is_valid() {
        let md = metadata();
        assert!(md.is_valid(0.0));
        assert!(!md.is_valid(-9999.0));
        assert!(!md.is_valid(f32::NAN));
    }
}
