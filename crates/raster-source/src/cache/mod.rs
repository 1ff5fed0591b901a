//! Chunk caching for raster reads.

mod chunk_cache;

pub use chunk_cache::{hash_path, ChunkCache, ChunkKey};
