//! Synthetic raster band generators.
//!
//! All generators return row-major data, top row first, matching the
//! north-up layout of rasters.

/// Creates a band with predictable values: `col * 1000 + row`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a band filled with one value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a band whose value equals the column index.
///
/// The mean over any full set of columns `a..b` is `(a + b - 1) / 2`.
pub fn create_column_gradient(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            data.push(col as f32);
        }
    }
    data
}

/// Creates an NDVI-like band in `[-0.2, 0.9]`, greener towards the bottom right.
pub fn create_vegetation_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x = col as f32 / width.max(1) as f32;
            let y = row as f32 / height.max(1) as f32;
            data.push(-0.2 + 0.55 * x + 0.55 * y);
        }
    }
    data
}

/// Creates a constant band with a rectangle of pixels set to `fill`.
///
/// `masked` is `(col0, row0, width, height)`; positions outside the band are ignored.
pub fn create_masked_grid(
    width: usize,
    height: usize,
    value: f32,
    fill: f32,
    masked: (usize, usize, usize, usize),
) -> Vec<f32> {
    let mut data = vec![value; width * height];
    let (col0, row0, mask_w, mask_h) = masked;
    for row in row0..(row0 + mask_h).min(height) {
        for col in col0..(col0 + mask_w).min(width) {
            data[row * width + col] = fill;
        }
    }
    data
}

/// Creates a zero band with NaN at the given `(col, row)` positions.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_gradient() {
        let data = create_column_gradient(4, 2);
        assert_eq!(data, vec![0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vegetation_range() {
        let data = create_vegetation_grid(50, 40);
        assert!(data.iter().all(|v| (-0.2..=0.9).contains(v)));
    }

    #[test]
    fn test_masked_grid() {
        let data = create_masked_grid(4, 3, 1.0, -9999.0, (2, 1, 5, 5));
        assert_eq!(data.iter().filter(|v| **v == -9999.0).count(), 4);
        assert_eq!(data[0], 1.0);
        assert_eq!(data[1 * 4 + 2], -9999.0);
    }

    #[test]
    fn test_grid_with_nans() {
        let data = create_grid_with_nans(3, 3, &[(1, 1), (9, 9)]);
        assert!(data[4].is_nan());
        assert_eq!(data.iter().filter(|v| v.is_nan()).count(), 1);
    }
}
