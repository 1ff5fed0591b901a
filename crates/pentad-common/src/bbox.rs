//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in the coordinate space of the grid and rasters.
///
/// For geographic rasters coordinates are in degrees (x = longitude,
/// y = latitude). For projected rasters they are in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a bounding box and check that it encloses a non-empty area.
    pub fn try_new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self, BboxError> {
        let bbox = Self::new(min_x, min_y, max_x, max_y);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check that all bounds are finite and `min < max` on both axes.
    pub fn validate(&self) -> Result<(), BboxError> {
        for (name, value) in [
            ("min_x", self.min_x),
            ("min_y", self.min_y),
            ("max_x", self.max_x),
            ("max_y", self.max_y),
        ] {
            if !value.is_finite() {
                return Err(BboxError::NonFinite {
                    bound: name,
                    value,
                });
            }
        }

        if self.min_x >= self.max_x {
            return Err(BboxError::EmptyX {
                min: self.min_x,
                max: self.max_x,
            });
        }
        if self.min_y >= self.max_y {
            return Err(BboxError::EmptyY {
                min: self.min_y,
                max: self.max_y,
            });
        }

        Ok(())
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Check if this bbox overlaps another with a non-zero area.
    ///
    /// Boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Swap the axes: `(x, y)` becomes `(y, x)`.
    pub fn transposed(&self) -> Self {
        Self {
            min_x: self.min_y,
            min_y: self.min_x,
            max_x: self.max_y,
            max_y: self.max_x,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxError {
    #[error("{bound} is not a finite number ({value})")]
    NonFinite { bound: &'static str, value: f64 },

    #[error("x_min ({min}) must be less than x_max ({max})")]
    EmptyX { min: f64, max: f64 },

    #[error("y_min ({min}) must be less than y_max ({max})")]
    EmptyY { min: f64, max: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection.min_x, 5.0);
        assert_eq!(intersection.min_y, 5.0);
        assert_eq!(intersection.max_x, 10.0);
        assert_eq!(intersection.max_y, 10.0);
    }

    #[test]
    fn test_validate_rejects_inverted_x() {
        let err = BoundingBox::try_new(10.0, 0.0, 10.0, 5.0).unwrap_err();
        assert!(matches!(err, BboxError::EmptyX { .. }));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let err = BoundingBox::try_new(0.0, f64::NAN, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, BboxError::NonFinite { bound: "min_y", .. }));
    }
}
