//! Device-visible storage. Every texture tries the fast sampler-local
//! pool first and falls back to generic aligned heap memory; frees are
//! routed back to whichever allocator produced the block.

mod pool;

pub use pool::{FastPool, PoolBlock};

use log::trace;

use crate::error::{TextureError, TextureResult};

/// Alignment of every device allocation.
pub const BLOCK_ALIGN: usize = 16;

/// Where a texture's bytes live.
#[derive(Debug)]
pub enum TextureStorage {
    /// Inside the fast pool; `len` is the requested (unaligned) length.
    Fast { block: PoolBlock, len: usize },
    /// Generic heap memory.
    Heap(Vec<u8>),
}

impl TextureStorage {
    pub fn len(&self) -> usize {
        match self {
            Self::Fast { len, .. } => *len,
            Self::Heap(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn in_fast_pool(&self) -> bool {
        matches!(self, Self::Fast { .. })
    }
}

/// Counters for the visibility flushes issued after CPU writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub calls: u64,
    pub bytes: u64,
}

/// Split of live texture bytes by allocator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub fast_pool_bytes: usize,
    pub heap_bytes: usize,
}

/// The allocation ladder plus flush bookkeeping.
pub struct DeviceMemory {
    pool: FastPool,
    heap_bytes: usize,
    heap_limit: Option<usize>,
    flush: FlushStats,
}

impl DeviceMemory {
    pub fn new(pool_capacity: usize, heap_limit: Option<usize>) -> Self {
        Self {
            pool: FastPool::new(pool_capacity, BLOCK_ALIGN),
            heap_bytes: 0,
            heap_limit,
            flush: FlushStats::default(),
        }
    }

    /// Fast pool first, heap second; zeroed either way. `OutOfMemory`
    /// when neither can serve.
    pub fn allocate(&mut self, size: usize) -> TextureResult<TextureStorage> {
        if let Some(block) = self.pool.allocate(size) {
            self.pool.slice_mut(&block).fill(0);
            trace!("fast pool +{size}B at {:#x}", block.offset);
            return Ok(TextureStorage::Fast { block, len: size });
        }

        if let Some(limit) = self.heap_limit {
            if self.heap_bytes + size > limit {
                return Err(TextureError::OutOfMemory { requested: size });
            }
        }
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            return Err(TextureError::OutOfMemory { requested: size });
        }
        data.resize(size, 0);
        self.heap_bytes += size;
        trace!("heap fallback +{size}B");
        Ok(TextureStorage::Heap(data))
    }

    /// Release storage through the allocator that produced it.
    pub fn free(&mut self, storage: TextureStorage) {
        match storage {
            TextureStorage::Fast { block, .. } => self.pool.free(block),
            TextureStorage::Heap(data) => self.heap_bytes -= data.len(),
        }
    }

    pub fn slice<'a>(&'a self, storage: &'a TextureStorage) -> &'a [u8] {
        match storage {
            TextureStorage::Fast { block, len } => &self.pool.slice(block)[..*len],
            TextureStorage::Heap(data) => data,
        }
    }

    pub fn slice_mut<'a>(&'a mut self, storage: &'a mut TextureStorage) -> &'a mut [u8] {
        match storage {
            TextureStorage::Fast { block, len } => &mut self.pool.slice_mut(block)[..*len],
            TextureStorage::Heap(data) => data,
        }
    }

    /// Record the device-visibility flush for a written range. The real
    /// device writes its data cache back here; the host build keeps the
    /// barrier observable through [`FlushStats`].
    pub fn flush_range(&mut self, storage: &TextureStorage, offset: usize, len: usize) {
        debug_assert!(offset + len <= storage.len());
        self.flush.calls += 1;
        self.flush.bytes += len as u64;
        trace!("flush {len}B at +{offset}");
    }

    pub fn flush_stats(&self) -> FlushStats {
        self.flush
    }

    pub fn usage(&self) -> MemoryUsage {
        MemoryUsage {
            fast_pool_bytes: self.pool.used(),
            heap_bytes: self.heap_bytes,
        }
    }
}
