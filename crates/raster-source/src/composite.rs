//! Temporal composites over a collection of scenes.
//!
//! A collection is filtered by acquisition window and scene properties, then
//! reduced per pixel into a single in-memory raster.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::source::{InMemoryRaster, RasterSource};
use crate::types::RasterMetadata;

/// Per-pixel reduction over the selected scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Mean of the valid values of each pixel.
    #[default]
    Mean,
    /// The earliest acquired scene.
    First,
}

/// Scene selection criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFilter {
    /// Inclusive lower bound on `acquired`.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `acquired`.
    pub end: Option<DateTime<Utc>>,
    /// Properties that must be present with exactly these values.
    pub properties: BTreeMap<String, String>,
}

impl SceneFilter {
    /// Whether a scene passes the filter.
    ///
    /// A scene without an acquisition time fails any date bound.
    pub fn matches(&self, metadata: &RasterMetadata) -> bool {
        if self.start.is_some() || self.end.is_some() {
            let Some(acquired) = metadata.acquired else {
                return false;
            };
            if self.start.is_some_and(|start| acquired < start) {
                return false;
            }
            if self.end.is_some_and(|end| acquired >= end) {
                return false;
            }
        }

        self.properties
            .iter()
            .all(|(key, value)| metadata.properties.get(key) == Some(value))
    }
}

/// Filter `scenes` and reduce them into one raster named `name`.
///
/// Selected scenes must share extent, shape and band set. The result has a
/// NaN fill value; pixels with no valid value in any scene are NaN.
pub fn composite(
    name: &str,
    scenes: &[Arc<dyn RasterSource>],
    filter: &SceneFilter,
    reducer: Reducer,
) -> Result<InMemoryRaster> {
    let mut selected: Vec<&Arc<dyn RasterSource>> = scenes
        .iter()
        .filter(|scene| filter.matches(scene.metadata()))
        .collect();

    if selected.is_empty() {
        return Err(RasterError::composite(format!(
            "no scene of {} matches the filter",
            scenes.len()
        )));
    }

    // Earliest first; scenes without a date keep their order at the end.
    selected.sort_by_key(|scene| (scene.metadata().acquired.is_none(), scene.metadata().acquired));

    let reference = selected[0].metadata();
    for scene in &selected[1..] {
        if !reference.same_geometry(scene.metadata()) {
            return Err(RasterError::composite(format!(
                "scene '{}' does not match the extent, shape or bands of '{}'",
                scene.metadata().name,
                reference.name
            )));
        }
    }

    tracing::debug!(
        name,
        scenes = selected.len(),
        reducer = ?reducer,
        "Building composite"
    );

    let mut bands = Vec::with_capacity(reference.bands.len());
    for band in &reference.bands {
        let data = match reducer {
            Reducer::First => first_valid(selected[0].as_ref(), band)?,
            Reducer::Mean => mean_band(&selected, band)?,
        };
        bands.push(data);
    }

    let metadata = RasterMetadata {
        name: name.to_string(),
        extent: reference.extent,
        shape: reference.shape,
        bands: reference.bands.clone(),
        fill_value: f32::NAN,
        units: reference.units,
        acquired: reference.acquired,
        properties: filter.properties.clone(),
    };
    InMemoryRaster::from_parts(metadata, bands)
}

/// One band of a single scene with its fill value mapped to NaN.
fn first_valid(scene: &dyn RasterSource, band: &str) -> Result<Vec<f32>> {
    let metadata = scene.metadata();
    let mut data = scene.read_band(band)?;
    for value in &mut data {
        if !metadata.is_valid(*value) {
            *value = f32::NAN;
        }
    }
    Ok(data)
}

fn mean_band(scenes: &[&Arc<dyn RasterSource>], band: &str) -> Result<Vec<f32>> {
    let layers = scenes
        .iter()
        .map(|scene| Ok((scene.read_band(band)?, scene.metadata())))
        .collect::<Result<Vec<_>>>()?;

    let pixel_count = scenes[0].metadata().pixel_count();
    let mean = (0..pixel_count)
        .into_par_iter()
        .map(|idx| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for (data, metadata) in &layers {
                let value = data[idx];
                if metadata.is_valid(value) {
                    sum += value as f64;
                    count += 1;
                }
            }
            if count == 0 {
                f32::NAN
            } else {
                (sum / count as f64) as f32
            }
        })
        .collect();

    Ok(mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pentad_common::BoundingBox;

    fn scene(day: u32, direction: &str, values: Vec<f32>) -> Arc<dyn RasterSource> {
        Arc::new(
            InMemoryRaster::new(format!("scene-{}", day), BoundingBox::new(0.0, 0.0, 2.0, 1.0), (2, 1))
                .with_band("ssm", values)
                .unwrap()
                .with_fill_value(-9999.0)
                .with_acquired(Utc.with_ymd_and_hms(2017, 6, day, 0, 0, 0).unwrap())
                .with_property("SATELLITE_DIRECTION", direction),
        )
    }

    fn descending() -> SceneFilter {
        SceneFilter {
            properties: BTreeMap::from([("SATELLITE_DIRECTION".to_string(), "D".to_string())]),
            ..Default::default()
        }
    }

    #[test]
    fn test_mean_skips_invalid_and_filtered() {
        let scenes = vec![
            scene(1, "D", vec![1.0, -9999.0]),
            scene(2, "A", vec![100.0, 100.0]),
            scene(3, "D", vec![3.0, 4.0]),
        ];
        let raster = composite("ssm", &scenes, &descending(), Reducer::Mean).unwrap();
        let data = raster.read_band("ssm").unwrap();
        assert_eq!(data, vec![2.0, 4.0]);
    }

    #[test]
    fn test_first_takes_earliest() {
        let scenes = vec![scene(5, "D", vec![5.0, 5.0]), scene(2, "D", vec![2.0, -9999.0])];
        let raster = composite("ssm", &scenes, &descending(), Reducer::First).unwrap();
        let data = raster.read_band("ssm").unwrap();
        assert_eq!(data[0], 2.0);
        assert!(data[1].is_nan());
    }

    #[test]
    fn test_date_window_is_half_open() {
        let filter = SceneFilter {
            start: Some(Utc.with_ymd_and_hms(2017, 6, 2, 0, 0, 0).unwrap()),
            end: Some(Utc.with_ymd_and_hms(2017, 6, 3, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let scenes = vec![scene(1, "D", vec![1.0, 1.0]), scene(2, "D", vec![2.0, 2.0]), scene(3, "D", vec![3.0, 3.0])];
        let raster = composite("ssm", &scenes, &filter, Reducer::Mean).unwrap();
        assert_eq!(raster.read_band("ssm").unwrap(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_empty_selection_fails() {
        let scenes = vec![scene(1, "A", vec![1.0, 1.0])];
        let err = composite("ssm", &scenes, &descending(), Reducer::Mean).unwrap_err();
        assert!(matches!(err, RasterError::Composite(_)));
    }

    #[test]
    fn test_geometry_mismatch_fails() {
        let other: Arc<dyn RasterSource> = Arc::new(
            InMemoryRaster::new("wide", BoundingBox::new(0.0, 0.0, 4.0, 1.0), (2, 1))
                .with_band("ssm", vec![0.0, 0.0])
                .unwrap(),
        );
        let scenes = vec![scene(1, "D", vec![1.0, 1.0]), other];
        let err = composite("ssm", &scenes, &SceneFilter::default(), Reducer::Mean).unwrap_err();
        assert!(matches!(err, RasterError::Composite(_)));
    }
}
