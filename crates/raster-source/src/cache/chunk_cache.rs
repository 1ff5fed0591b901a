//! LRU cache for decoded raster chunks.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;

use crate::types::CacheStats;

/// Identifies one chunk of one band array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    /// Hash of the band array path, see [`hash_path`].
    pub array: u64,
    pub chunk_x: usize,
    pub chunk_y: usize,
}

impl ChunkKey {
    pub fn new(array: u64, chunk_x: usize, chunk_y: usize) -> Self {
        Self {
            array,
            chunk_x,
            chunk_y,
        }
    }
}

/// Memory-bounded LRU cache of decoded chunks.
///
/// Chunks are shared as `Arc<[f32]>` so a hit never copies pixel data.
pub struct ChunkCache {
    cache: LruCache<ChunkKey, Arc<[f32]>>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ChunkCache {
    /// Create a cache holding at most `memory_limit` bytes of pixel data.
    pub fn new(memory_limit: usize) -> Self {
        // Entry cap assumes 256x256 f32 chunks; the byte limit is the real bound.
        let chunk_size_estimate = 256 * 256 * std::mem::size_of::<f32>();
        let max_entries = (memory_limit / chunk_size_estimate).max(16);

        Self {
            cache: LruCache::new(NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN)),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a chunk, counting the hit or miss.
    pub fn get(&mut self, key: &ChunkKey) -> Option<Arc<[f32]>> {
        match self.cache.get(key) {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(data))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert a chunk, evicting least recently used chunks to stay under the limit.
    ///
    /// Chunks larger than the whole limit are not cached.
    pub fn insert(&mut self, key: ChunkKey, data: Arc<[f32]>) {
        let data_size = byte_size(&data);
        if data_size > self.memory_limit {
            return;
        }

        if let Some(previous) = self.cache.pop(&key) {
            self.current_memory = self.current_memory.saturating_sub(byte_size(&previous));
        }

        while self.current_memory + data_size > self.memory_limit {
            match self.cache.pop_lru() {
                Some((_, evicted)) => {
                    self.current_memory = self.current_memory.saturating_sub(byte_size(&evicted));
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                None => break,
            }
        }

        // The entry cap may also push out an entry.
        if let Some((_, evicted)) = self.cache.push(key, data) {
            self.current_memory = self.current_memory.saturating_sub(byte_size(&evicted));
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.current_memory += data_size;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    /// Current memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn byte_size(data: &[f32]) -> usize {
    std::mem::size_of_val(data)
}

/// Stable key component for a band array path.
pub fn hash_path(path: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    hasher.finish()
}
