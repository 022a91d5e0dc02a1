//! The fast device-local pool: a fixed arena handing out aligned blocks
//! through a first-fit free list, coalescing neighbors on free.

/// One contiguous free span inside the pool, sorted by offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FreeRegion {
    offset: usize,
    size: usize,
}

/// A span handed out by [`FastPool::allocate`]; returned on free.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolBlock {
    pub offset: usize,
    /// Aligned size actually reserved.
    pub size: usize,
}

/// Fixed-capacity arena modelling the sampler-local memory.
pub struct FastPool {
    storage: Vec<u8>,
    free_regions: Vec<FreeRegion>,
    alignment: usize,
    used: usize,
}

impl FastPool {
    pub fn new(capacity: usize, alignment: usize) -> Self {
        debug_assert!(alignment.is_power_of_two());
        let capacity = capacity & !(alignment - 1);
        let free_regions = if capacity > 0 {
            vec![FreeRegion { offset: 0, size: capacity }]
        } else {
            Vec::new()
        };
        Self {
            storage: vec![0; capacity],
            free_regions,
            alignment,
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    fn aligned_size(&self, size: usize) -> usize {
        (size + self.alignment - 1) & !(self.alignment - 1)
    }

    /// First fit: split the first region large enough, consuming it
    /// entirely on an exact fit. `None` when no region can serve.
    pub fn allocate(&mut self, size: usize) -> Option<PoolBlock> {
        if size == 0 {
            return None;
        }
        let size = self.aligned_size(size);
        let index = self.free_regions.iter().position(|r| r.size >= size)?;
        let offset = self.free_regions[index].offset;
        if self.free_regions[index].size == size {
            self.free_regions.remove(index);
        } else {
            let region = &mut self.free_regions[index];
            region.offset += size;
            region.size -= size;
        }
        self.used += size;
        Some(PoolBlock { offset, size })
    }

    /// Return a block, merging it with free neighbors so fragmentation
    /// stays bounded by the allocation pattern, not the free order.
    pub fn free(&mut self, block: PoolBlock) {
        let left = self
            .free_regions
            .iter()
            .position(|r| r.offset + r.size == block.offset);
        let right = self
            .free_regions
            .iter()
            .position(|r| block.offset + block.size == r.offset);

        match (left, right) {
            (Some(l), Some(r)) => {
                let right_size = self.free_regions[r].size;
                self.free_regions[l].size += block.size + right_size;
                self.free_regions.remove(r);
            }
            (Some(l), None) => {
                self.free_regions[l].size += block.size;
            }
            (None, Some(r)) => {
                let region = &mut self.free_regions[r];
                region.offset = block.offset;
                region.size += block.size;
            }
            (None, None) => {
                let at = self
                    .free_regions
                    .iter()
                    .position(|r| r.offset > block.offset)
                    .unwrap_or(self.free_regions.len());
                self.free_regions.insert(
                    at,
                    FreeRegion {
                        offset: block.offset,
                        size: block.size,
                    },
                );
            }
        }
        self.used -= block.size;
    }

    pub fn slice(&self, block: &PoolBlock) -> &[u8] {
        &self.storage[block.offset..block.offset + block.size]
    }

    pub fn slice_mut(&mut self, block: &PoolBlock) -> &mut [u8] {
        &mut self.storage[block.offset..block.offset + block.size]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_first_fit() {
        let mut pool = FastPool::new(256, 16);
        let a = pool.allocate(20).unwrap();
        let b = pool.allocate(16).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(a.size, 32);
        assert_eq!(b.offset, 32);
        assert_eq!(pool.used(), 48);
    }

    #[test]
    fn exhaustion_returns_none_without_side_effects() {
        let mut pool = FastPool::new(64, 16);
        assert!(pool.allocate(64).is_some());
        assert!(pool.allocate(16).is_none());
        assert_eq!(pool.used(), 64);
    }

    #[test]
    fn freeing_coalesces_neighbors() {
        let mut pool = FastPool::new(128, 16);
        let a = pool.allocate(32).unwrap();
        let b = pool.allocate(32).unwrap();
        let c = pool.allocate(32).unwrap();

        // Free the middle, then its neighbors; the arena must reunite.
        pool.free(b);
        pool.free(a);
        pool.free(c);
        assert_eq!(pool.used(), 0);
        let whole = pool.allocate(128).unwrap();
        assert_eq!(whole.offset, 0);
    }

    #[test]
    fn freed_space_is_reused() {
        let mut pool = FastPool::new(64, 16);
        let a = pool.allocate(32).unwrap();
        let _b = pool.allocate(32).unwrap();
        pool.free(a);
        let c = pool.allocate(16).unwrap();
        assert_eq!(c.offset, 0);
    }
}
