//! Zarr attribute layout for raster band arrays.
//!
//! Every band of a raster is a separate 2-D float32 array stored under
//! `<raster>/<band>/`, and every band array carries the same raster-level
//! attributes plus its own `band` and `band_index`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pentad_common::BoundingBox;
use serde::{Deserialize, Serialize};

use crate::error::{RasterError, Result};
use crate::types::CoordinateUnits;

/// Attributes stored on each band array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAttributes {
    /// Raster name.
    #[serde(default)]
    pub name: String,
    /// Band name. Defaults to the array directory name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    /// Position of the band within the raster.
    #[serde(default)]
    pub band_index: usize,
    /// Outer edges `[min_x, min_y, max_x, max_y]`.
    pub bbox: [f64; 4],
    #[serde(default)]
    pub units: CoordinateUnits,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BandAttributes {
    /// Parse from the attribute map of a Zarr array.
    pub fn from_map(attrs: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(attrs.clone()))
            .map_err(|e| RasterError::invalid_metadata(format!("band attributes: {}", e)))
    }

    /// Serialize into a Zarr attribute map.
    pub fn to_map(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(RasterError::invalid_metadata(format!(
                "attributes serialized to {}",
                other
            ))),
        }
    }

    /// Raster extent, validated.
    pub fn extent(&self) -> Result<BoundingBox> {
        let [min_x, min_y, max_x, max_y] = self.bbox;
        BoundingBox::try_new(min_x, min_y, max_x, max_y)
            .map_err(|e| RasterError::invalid_metadata(format!("bbox: {}", e)))
    }
}
