//! Shared test utilities for the pentad-covariates workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Test data path helpers and temporary file helpers
//! - Raster band generators
//! - Grid CSV and extent fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod paths;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;
pub use paths::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Assert that an optional mean is present and approximately equal to a value.
///
/// ```ignore
/// assert_mean_eq!(record.value("X_NDVI"), 0.5, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_mean_eq {
    ($value:expr, $expected:expr, $epsilon:expr) => {{
        match $value {
            Some(v) => $crate::assert_approx_eq!(v, $expected, $epsilon),
            None => panic!("expected a mean of {:?}, found missing", $expected),
        }
    }};
}
