//! Opening rasters from declarative specs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::cache::ChunkCache;
use crate::composite::{composite, Reducer, SceneFilter};
use crate::config::RasterConfig;
use crate::error::{RasterError, Result};
use crate::source::{RasterSource, ZarrRaster};
use crate::types::CacheStats;

/// How to obtain a raster for a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RasterSpec {
    /// A single Zarr raster directory.
    Zarr { path: PathBuf },

    /// A composite over several Zarr scenes.
    Collection {
        /// Explicit scene directories.
        #[serde(default)]
        scenes: Vec<PathBuf>,
        /// A directory whose immediate subdirectories are scenes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scenes_dir: Option<PathBuf>,
        /// First day included.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<NaiveDate>,
        /// First day excluded.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        filters: BTreeMap<String, String>,
        #[serde(default)]
        reducer: Reducer,
    },
}

impl RasterSpec {
    /// Check the spec without touching the file system.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            RasterSpec::Zarr { path } => {
                if path.as_os_str().is_empty() {
                    return Err("zarr raster path is empty".to_string());
                }
            }
            RasterSpec::Collection {
                scenes,
                scenes_dir,
                start,
                end,
                ..
            } => {
                if scenes.is_empty() && scenes_dir.is_none() {
                    return Err("collection needs `scenes` or `scenes_dir`".to_string());
                }
                if let (Some(start), Some(end)) = (start, end) {
                    if start >= end {
                        return Err(format!("collection window {} .. {} is empty", start, end));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Turns raster specs into readable sources.
pub trait RasterProvider: Send + Sync {
    fn open(&self, name: &str, spec: &RasterSpec) -> Result<Arc<dyn RasterSource>>;

    /// Statistics of any cache shared by opened rasters.
    fn cache_stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// Opens Zarr rasters from the local file system.
///
/// All rasters opened by one provider share a single chunk cache.
pub struct ZarrProvider {
    base_dir: Option<PathBuf>,
    chunk_cache: Arc<Mutex<ChunkCache>>,
}

impl ZarrProvider {
    pub fn new(config: &RasterConfig) -> Self {
        Self {
            base_dir: None,
            chunk_cache: Arc::new(Mutex::new(ChunkCache::new(config.chunk_cache_size_bytes()))),
        }
    }

    /// Resolve relative raster paths against `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn open_zarr(&self, path: &Path) -> Result<ZarrRaster> {
        ZarrRaster::open_with_cache(self.resolve(path), Arc::clone(&self.chunk_cache))
    }

    fn scene_paths(&self, scenes: &[PathBuf], scenes_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = scenes.iter().map(|p| self.resolve(p)).collect();

        if let Some(dir) = scenes_dir {
            let dir = self.resolve(dir);
            let mut found = Vec::new();
            for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
                let entry = entry.map_err(|e| RasterError::open_failed(e.to_string()))?;
                if entry.file_type().is_dir() {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            paths.extend(found);
        }

        Ok(paths)
    }
}

impl RasterProvider for ZarrProvider {
    fn open(&self, name: &str, spec: &RasterSpec) -> Result<Arc<dyn RasterSource>> {
        spec.validate().map_err(RasterError::Config)?;

        match spec {
            RasterSpec::Zarr { path } => Ok(Arc::new(self.open_zarr(path)?)),
            RasterSpec::Collection {
                scenes,
                scenes_dir,
                start,
                end,
                filters,
                reducer,
            } => {
                let paths = self.scene_paths(scenes, scenes_dir.as_deref())?;
                let sources = paths
                    .iter()
                    .map(|path| Ok(Arc::new(self.open_zarr(path)?) as Arc<dyn RasterSource>))
                    .collect::<Result<Vec<_>>>()?;

                let filter = SceneFilter {
                    start: start.map(start_of_day),
                    end: end.map(start_of_day),
                    properties: filters.clone(),
                };
                let raster = composite(name, &sources, &filter, *reducer)?;
                Ok(Arc::new(raster))
            }
        }
    }

    fn cache_stats(&self) -> CacheStats {
        self.chunk_cache
            .lock()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}
