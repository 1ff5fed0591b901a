//! Zarr V3 raster reader.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use walkdir::WalkDir;
use zarrs::array::Array;
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::attributes::BandAttributes;
use crate::cache::{hash_path, ChunkCache, ChunkKey};
use crate::config::RasterConfig;
use crate::error::{RasterError, Result};
use crate::types::{CacheStats, PixelWindow, RasterMetadata, RasterWindow};

use super::{check_request, RasterSource};

/// One band array of a Zarr raster.
struct BandArray {
    array: Array<FilesystemStore>,
    /// Hash of the band directory, used in chunk cache keys.
    path_hash: u64,
    /// Chunk dimensions (width, height).
    chunk_shape: (usize, usize),
}

/// A raster stored as one Zarr V3 array per band.
///
/// ```text
/// <root>/
///   NDVI/zarr.json   (+ chunk files)
///   EVI/zarr.json
/// ```
///
/// Windows are assembled from whole chunks, and decoded chunks are kept in a
/// shared LRU cache so neighbouring cells reuse them.
pub struct ZarrRaster {
    root: PathBuf,
    metadata: RasterMetadata,
    /// Band arrays in band order.
    arrays: Vec<BandArray>,
    chunk_cache: Arc<Mutex<ChunkCache>>,
}

impl ZarrRaster {
    /// Open a raster with its own chunk cache.
    pub fn open(root: impl AsRef<Path>, config: &RasterConfig) -> Result<Self> {
        let cache = Arc::new(Mutex::new(ChunkCache::new(config.chunk_cache_size_bytes())));
        Self::open_with_cache(root, cache)
    }

    /// Open a raster that shares an existing chunk cache.
    pub fn open_with_cache(root: impl AsRef<Path>, chunk_cache: Arc<Mutex<ChunkCache>>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let band_dirs = discover_band_dirs(&root)?;
        if band_dirs.is_empty() {
            return Err(RasterError::open_failed(format!(
                "no band arrays (*/zarr.json) under {}",
                root.display()
            )));
        }

        let mut bands: Vec<(BandAttributes, String, BandArray)> = Vec::with_capacity(band_dirs.len());
        for dir in band_dirs {
            let (attrs, array) = open_band(&dir)?;
            let dir_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let band_name = attrs.band.clone().unwrap_or(dir_name);
            bands.push((attrs, band_name, array));
        }
        bands.sort_by(|a, b| a.0.band_index.cmp(&b.0.band_index).then_with(|| a.1.cmp(&b.1)));

        let metadata = Self::build_metadata(&root, &bands)?;
        let arrays = bands.into_iter().map(|(_, _, array)| array).collect();

        tracing::debug!(
            path = %root.display(),
            bands = ?metadata.bands,
            width = metadata.shape.0,
            height = metadata.shape.1,
            "Opened Zarr raster"
        );

        Ok(Self {
            root,
            metadata,
            arrays,
            chunk_cache,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raster metadata from the first band; every other band must agree on geometry.
    fn build_metadata(root: &Path, bands: &[(BandAttributes, String, BandArray)]) -> Result<RasterMetadata> {
        let (first_attrs, _, first_array) = &bands[0];
        let extent = first_attrs.extent()?;

        let shape = first_array.array.shape();
        if shape.len() != 2 {
            return Err(RasterError::invalid_metadata(format!(
                "band arrays must be 2-D, found {} dimensions",
                shape.len()
            )));
        }
        // Zarr is [rows, cols], metadata is (width, height)
        let raster_shape = (shape[1] as usize, shape[0] as usize);
        if raster_shape.0 == 0 || raster_shape.1 == 0 {
            return Err(RasterError::invalid_metadata("raster has no pixels"));
        }

        let mut names = Vec::with_capacity(bands.len());
        for (attrs, name, band) in bands {
            if band.array.shape() != shape {
                return Err(RasterError::invalid_metadata(format!(
                    "band '{}' has shape {:?}, expected {:?}",
                    name,
                    band.array.shape(),
                    shape
                )));
            }
            if attrs.extent()? != extent {
                return Err(RasterError::invalid_metadata(format!(
                    "band '{}' has a different bbox",
                    name
                )));
            }
            if names.contains(name) {
                return Err(RasterError::invalid_metadata(format!("duplicate band '{}'", name)));
            }
            names.push(name.clone());
        }

        let fill_value = first_array
            .array
            .fill_value()
            .as_ne_bytes()
            .try_into()
            .map(f32::from_ne_bytes)
            .unwrap_or(f32::NAN);

        let name = if first_attrs.name.is_empty() {
            root.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            first_attrs.name.clone()
        };

        Ok(RasterMetadata {
            name,
            extent,
            shape: raster_shape,
            bands: names,
            fill_value,
            units: first_attrs.units,
            acquired: first_attrs.acquired,
            properties: first_attrs.properties.clone(),
        })
    }

    /// Chunk coordinates intersecting a window.
    fn chunks_for_window(band: &BandArray, window: &PixelWindow) -> Vec<(usize, usize)> {
        let (chunk_w, chunk_h) = band.chunk_shape;
        let min_chunk_x = window.col0 / chunk_w;
        let max_chunk_x = (window.col_end() + chunk_w - 1) / chunk_w;
        let min_chunk_y = window.row0 / chunk_h;
        let max_chunk_y = (window.row_end() + chunk_h - 1) / chunk_h;

        (min_chunk_y..max_chunk_y)
            .flat_map(|cy| (min_chunk_x..max_chunk_x).map(move |cx| (cx, cy)))
            .collect()
    }

    /// Bounds of a chunk clipped to the raster: (start_col, start_row, width, height).
    fn chunk_bounds(&self, band: &BandArray, chunk_x: usize, chunk_y: usize) -> (usize, usize, usize, usize) {
        let (chunk_w, chunk_h) = band.chunk_shape;
        let (grid_w, grid_h) = self.metadata.shape;
        let start_col = chunk_x * chunk_w;
        let start_row = chunk_y * chunk_h;
        (
            start_col,
            start_row,
            chunk_w.min(grid_w - start_col),
            chunk_h.min(grid_h - start_row),
        )
    }

    /// Read a decoded chunk, consulting the cache first.
    fn read_chunk(&self, band: &BandArray, chunk_x: usize, chunk_y: usize) -> Result<Arc<[f32]>> {
        let key = ChunkKey::new(band.path_hash, chunk_x, chunk_y);

        if let Some(data) = self.lock_cache().get(&key) {
            return Ok(data);
        }

        let (start_col, start_row, width, height) = self.chunk_bounds(band, chunk_x, chunk_y);
        let subset = ArraySubset::new_with_start_shape(
            vec![start_row as u64, start_col as u64],
            vec![height as u64, width as u64],
        )
        .map_err(|e| RasterError::read_failed(e.to_string()))?;

        let data: Vec<f32> = band
            .array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| RasterError::read_failed(e.to_string()))?;
        let data: Arc<[f32]> = data.into();

        self.lock_cache().insert(key, Arc::clone(&data));
        Ok(data)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ChunkCache> {
        // The cache holds no invariants a panicking reader could break.
        self.chunk_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RasterSource for ZarrRaster {
    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_window(&self, band_name: &str, window: &PixelWindow) -> Result<RasterWindow> {
        let index = check_request(&self.metadata, band_name, window)?;
        let band = &self.arrays[index];

        let mut output = vec![self.metadata.fill_value; window.len()];
        if window.is_empty() {
            return Ok(RasterWindow::new(*window, output));
        }

        let chunks = Self::chunks_for_window(band, window);
        tracing::trace!(
            path = %self.root.display(),
            band = band_name,
            window = %window,
            chunks = chunks.len(),
            "Reading raster window"
        );

        for (cx, cy) in chunks {
            let chunk = self.read_chunk(band, cx, cy)?;
            let (start_col, start_row, chunk_w, chunk_h) = self.chunk_bounds(band, cx, cy);

            let col_from = window.col0.max(start_col);
            let col_to = window.col_end().min(start_col + chunk_w);
            let row_from = window.row0.max(start_row);
            let row_to = window.row_end().min(start_row + chunk_h);
            if col_from >= col_to || row_from >= row_to {
                continue;
            }

            let run = col_to - col_from;
            for row in row_from..row_to {
                let src = (row - start_row) * chunk_w + (col_from - start_col);
                let dst = (row - window.row0) * window.width + (col_from - window.col0);
                if src + run <= chunk.len() {
                    output[dst..dst + run].copy_from_slice(&chunk[src..src + run]);
                }
            }
        }

        Ok(RasterWindow::new(*window, output))
    }

    fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }
}

/// Immediate subdirectories of `root` that hold a Zarr array.
fn discover_band_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(RasterError::open_failed(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RasterError::open_failed(e.to_string()))?;
        if entry.file_type().is_dir() && entry.path().join("zarr.json").is_file() {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn open_band(dir: &Path) -> Result<(BandAttributes, BandArray)> {
    let store = FilesystemStore::new(dir)
        .map_err(|e| RasterError::open_failed(format!("{}: {}", dir.display(), e)))?;
    let array = Array::open(Arc::new(store), "/")
        .map_err(|e| RasterError::open_failed(format!("{}: {}", dir.display(), e)))?;

    let attrs = BandAttributes::from_map(array.attributes())?;

    let origin = vec![0u64; array.shape().len()];
    let chunk_shape = array
        .chunk_grid()
        .chunk_shape(&origin, array.shape())
        .map_err(|e| RasterError::invalid_metadata(e.to_string()))?
        .ok_or_else(|| RasterError::invalid_metadata("missing chunk shape"))?;
    if chunk_shape.len() != 2 {
        return Err(RasterError::invalid_metadata(format!(
            "{}: band arrays must be 2-D",
            dir.display()
        )));
    }
    let chunk_shape = (chunk_shape[1].get() as usize, chunk_shape[0].get() as usize);

    Ok((
        attrs,
        BandArray {
            array,
            path_hash: hash_path(&dir.to_string_lossy()),
            chunk_shape,
        },
    ))
}
