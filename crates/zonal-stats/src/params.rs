//! Sampling parameters shared by every aggregation of a run.

use serde::{Deserialize, Serialize};

/// Sampling parameters for zonal means.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Ground sampling distance in metres.
    pub scale: f64,

    /// Upper bound on sample points per cell.
    pub max_pixels: u64,

    /// Coarsen the sampling instead of failing when `max_pixels` is exceeded.
    pub best_effort: bool,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            scale: 100.0,
            max_pixels: 1_000_000,
            best_effort: false,
        }
    }
}

impl SamplingParams {
    /// Apply `SAMPLING_SCALE`, `SAMPLING_MAX_PIXELS` and `SAMPLING_BEST_EFFORT`.
    ///
    /// Values that fail to parse are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SAMPLING_SCALE") {
            if let Ok(scale) = val.parse() {
                self.scale = scale;
            }
        }

        if let Ok(val) = std::env::var("SAMPLING_MAX_PIXELS") {
            if let Ok(max) = val.parse() {
                self.max_pixels = max;
            }
        }

        if let Ok(val) = std::env::var("SAMPLING_BEST_EFFORT") {
            self.best_effort = val.to_lowercase() == "true" || val == "1";
        }

        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), String> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("scale must be a positive number, got {}", self.scale));
        }

        if self.max_pixels == 0 {
            return Err("max_pixels must be >= 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SamplingParams::default();
        assert_eq!(params.scale, 100.0);
        assert_eq!(params.max_pixels, 1_000_000);
        assert!(!params.best_effort);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let bad_scale = SamplingParams {
            scale: 0.0,
            ..Default::default()
        };
        assert!(bad_scale.validate().is_err());

        let nan_scale = SamplingParams {
            scale: f64::NAN,
            ..Default::default()
        };
        assert!(nan_scale.validate().is_err());

        let no_pixels = SamplingParams {
            max_pixels: 0,
            ..Default::default()
        };
        assert!(no_pixels.validate().is_err());
    }
}
