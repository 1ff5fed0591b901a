//! Raster access layer for zonal statistics.
//!
//! Rasters are north-up, multi-band float32 grids. This crate provides:
//!
//! - **Zarr V3 rasters**: one chunked array per band, read window by window
//! - **Chunk caching**: decoded chunks shared across reads in an LRU cache
//! - **Temporal composites**: date/property filtered collections reduced per pixel
//! - **Writing**: the same on-disk layout, for fixtures and data preparation
//!
//! # Architecture
//!
//! ```text
//! RasterSpec (catalog)
//!      │
//!      ▼
//! ZarrProvider::open(name, spec)
//!      │
//!      ├─► zarr:       ZarrRaster (shared ChunkCache)
//!      │
//!      └─► collection: ZarrRaster per scene
//!                │
//!                └─► composite(filter, reducer) ─► InMemoryRaster
//!      │
//!      ▼
//! Arc<dyn RasterSource>::read_window(band, window)
//! ```

pub mod attributes;
pub mod cache;
pub mod composite;
pub mod config;
pub mod error;
pub mod provider;
pub mod source;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use cache::{ChunkCache, ChunkKey};
pub use composite::{composite, Reducer, SceneFilter};
pub use config::{RasterConfig, ZarrCompression};
pub use error::{RasterError, Result};
pub use provider::{RasterProvider, RasterSpec, ZarrProvider};
pub use source::{InMemoryRaster, RasterSource, ZarrRaster};
pub use types::{CacheStats, CoordinateUnits, PixelWindow, RasterMetadata, RasterWindow};
pub use writer::{BandWriteResult, ZarrRasterWriter};
