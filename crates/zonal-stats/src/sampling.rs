//! Regular sample grids over a cell footprint.
//!
//! A cell (already clipped to the raster) is divided into `nx * ny` equal
//! sub-rectangles whose side is close to the sampling scale; the raster is
//! read at each sub-rectangle centre.

use pentad_common::BoundingBox;
use raster_source::CoordinateUnits;

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Smallest cosine used when converting metres to degrees of longitude.
const MIN_COS_LAT: f64 = 1e-6;

/// Why a sample grid could not be planned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanError {
    /// The scale is not a finite, positive number of metres.
    InvalidScale(f64),
    /// Strict planning needs more points than `max_pixels`.
    LimitExceeded { required: u64, max_pixels: u64 },
}

/// Sample points over a rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    pub area: BoundingBox,
    pub nx: u64,
    pub ny: u64,
    /// Scale in metres the grid was built with (larger than requested after coarsening).
    pub effective_scale: f64,
}

impl SampleGrid {
    /// Build the sample grid for `area` at `scale` metres.
    ///
    /// When the point count exceeds `max_pixels`, strict planning fails and
    /// best-effort planning doubles the scale until the count fits.
    pub fn plan(
        area: &BoundingBox,
        units: CoordinateUnits,
        scale: f64,
        max_pixels: u64,
        best_effort: bool,
    ) -> Result<Self, PlanError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PlanError::InvalidScale(scale));
        }
        let mut grid = Self::at_scale(area, units, scale);

        if grid.count() <= max_pixels {
            return Ok(grid);
        }
        if !best_effort {
            return Err(PlanError::LimitExceeded {
                required: grid.count(),
                max_pixels,
            });
        }

        // A single point always fits since max_pixels >= 1.
        while grid.count() > max_pixels.max(1) && (grid.nx > 1 || grid.ny > 1) {
            grid = Self::at_scale(area, units, grid.effective_scale * 2.0);
        }
        Ok(grid)
    }

    /// Sample grid at a fixed scale with no cap. `scale` must be positive.
    pub fn at_scale(area: &BoundingBox, units: CoordinateUnits, scale: f64) -> Self {
        let (dx, dy) = spacing(area, units, scale);
        Self {
            area: *area,
            nx: divisions(area.width(), dx),
            ny: divisions(area.height(), dy),
            effective_scale: scale,
        }
    }

    /// Number of sample points.
    pub fn count(&self) -> u64 {
        self.nx.saturating_mul(self.ny)
    }

    /// Sample point coordinates, row by row from the bottom.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let step_x = self.area.width() / self.nx as f64;
        let step_y = self.area.height() / self.ny as f64;
        (0..self.ny).flat_map(move |j| {
            let y = self.area.min_y + (j as f64 + 0.5) * step_y;
            (0..self.nx).map(move |i| (self.area.min_x + (i as f64 + 0.5) * step_x, y))
        })
    }
}

/// Spacing in coordinate units for a scale in metres.
fn spacing(area: &BoundingBox, units: CoordinateUnits, scale: f64) -> (f64, f64) {
    match units {
        CoordinateUnits::Meters => (scale, scale),
        CoordinateUnits::Degrees => {
            let dy = scale / METERS_PER_DEGREE;
            let (_, lat) = area.center();
            let cos_lat = lat.to_radians().cos().abs().max(MIN_COS_LAT);
            (dy / cos_lat, dy)
        }
    }
}

fn divisions(extent: f64, step: f64) -> u64 {
    // `as` saturates, so absurdly fine scales land on u64::MAX instead of wrapping
    ((extent / step).round() as u64).max(1)
}
