//! First-fit region pool
//!
//! Carves variable-sized regions out of one contiguous address range.
//! Free space is kept as a list of extents sorted by base address, and
//! neighbouring extents are merged again on release so the range does not
//! fragment over many create/reap cycles.
//!
//! The pool only does bookkeeping on addresses. It never reads or writes
//! the memory it manages.

use alloc::vec::Vec;
use hashbrown::HashMap;

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{Address, Region, RegionAllocator, Size};

use super::{align_up, PoolStats};

/// A first-fit allocator over a fixed address range
#[derive(Debug, Clone)]
pub struct RegionPool {
    /// The whole managed range
    range: Region,
    /// Granularity of every allocation
    alignment: Size,
    /// Free extents, sorted by base, never adjacent
    free: Vec<Region>,
    /// Live allocations: base -> rounded size
    allocated: HashMap<Address, Size>,
    stats: PoolStats,
}

impl RegionPool {
    /// Create a new region pool
    ///
    /// # Arguments
    ///
    /// * `base` - First address of the managed range; must be aligned to `alignment`
    /// * `size` - Length of the range in bytes
    /// * `alignment` - Allocation granularity, a power of two
    pub fn new(base: Address, size: Size, alignment: Size) -> Result<Self> {
        if size == 0 {
            return Err(invalid_argument("pool size must be non-zero"));
        }
        if !alignment.is_power_of_two() {
            return Err(invalid_argument("pool alignment must be a power of two"));
        }
        if base & (alignment - 1) != 0 {
            return Err(invalid_argument("pool base is not aligned"));
        }
        if base.checked_add(size).is_none() {
            return Err(invalid_argument("pool range overflows the address space"));
        }

        let range = Region::new(base, size);
        let mut free = Vec::new();
        free.push(range);

        Ok(Self {
            range,
            alignment,
            free,
            allocated: HashMap::new(),
            stats: PoolStats {
                capacity: size,
                ..PoolStats::default()
            },
        })
    }

    /// The managed address range
    pub fn range(&self) -> Region {
        self.range
    }

    /// Allocation granularity
    pub fn alignment(&self) -> Size {
        self.alignment
    }

    /// Size of the live allocation starting at `addr`
    ///
    /// Reports the rounded size actually reserved, which can exceed the
    /// requested size.
    pub fn get_size(&self, addr: Address) -> Option<Size> {
        self.allocated.get(&addr).copied()
    }

    /// Check whether `addr` is the base of a live allocation
    pub fn owns(&self, addr: Address) -> bool {
        self.allocated.contains_key(&addr)
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Number of free extents; 1 means the free space is unfragmented
    pub fn free_extents(&self) -> usize {
        self.free.len()
    }

    fn insert_free(&mut self, region: Region) {
        let pos = self.free.partition_point(|extent| extent.base < region.base);
        self.free.insert(pos, region);

        // Merge with the successor first so `pos` stays valid
        if pos + 1 < self.free.len() && self.free[pos].top() == self.free[pos + 1].base {
            self.free[pos].size += self.free[pos + 1].size;
            self.free.remove(pos + 1);
        }
        if pos > 0 && self.free[pos - 1].top() == self.free[pos].base {
            self.free[pos - 1].size += self.free[pos].size;
            self.free.remove(pos);
        }
    }
}

impl RegionAllocator for RegionPool {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        if size == 0 || size > self.range.size {
            return None;
        }
        let size = align_up(size, self.alignment);

        let slot = self.free.iter().position(|extent| extent.size >= size)?;
        let extent = &mut self.free[slot];
        let base = extent.base;
        if extent.size == size {
            self.free.remove(slot);
        } else {
            extent.base += size;
            extent.size -= size;
        }

        self.allocated.insert(base, size);
        self.stats.used += size;
        self.stats.allocations += 1;
        Some(base)
    }

    fn release(&mut self, addr: Address) {
        let Some(size) = self.allocated.remove(&addr) else {
            self.stats.spurious_releases += 1;
            log::warn!("region pool: release of unknown address {:#x}", addr);
            return;
        };

        self.insert_free(Region::new(addr, size));
        self.stats.used -= size;
        self.stats.releases += 1;
    }
}
