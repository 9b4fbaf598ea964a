//! Memory pool management
//!
//! This module provides a memory pool for fixed-size blocks. Every request
//! up to the block size is served with one whole block, which keeps
//! allocation and release O(1) and makes the pool a good fit for the
//! uniformly sized stacks handed to processes.

use alloc::vec;
use alloc::vec::Vec;

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{Address, RegionAllocator, Size};

use super::{align_up, PoolStats};

/// A memory pool for fixed-size blocks
#[derive(Debug, Clone)]
pub struct FixedBlockPool {
    /// Base address of the memory pool
    base: Address,
    /// Block size (including alignment padding)
    block_size: Size,
    /// Total number of blocks in the pool
    total_blocks: usize,
    /// Free list of available block indices; the last entry is handed out next
    free_list: Vec<usize>,
    /// Per-block in-use marker, catches double release
    in_use: Vec<bool>,
    stats: PoolStats,
}

impl FixedBlockPool {
    /// Create a new memory pool
    ///
    /// # Arguments
    ///
    /// * `base` - Base address of the memory pool
    /// * `size` - Total size of the memory pool in bytes
    /// * `block_size` - Size of each block in the pool
    /// * `alignment` - Alignment requirement for each block, a power of two
    pub fn new(base: Address, size: Size, block_size: Size, alignment: Size) -> Result<Self> {
        if !alignment.is_power_of_two() || block_size == 0 {
            return Err(invalid_argument("block size and alignment must be valid"));
        }
        if base & (alignment - 1) != 0 {
            return Err(invalid_argument("pool base is not aligned"));
        }

        let block_size = align_up(block_size, alignment);
        let total_blocks = size / block_size;
        if total_blocks == 0 {
            return Err(invalid_argument("pool too small for a single block"));
        }

        // Reverse order so block 0 is handed out first
        let free_list = (0..total_blocks).rev().collect();

        Ok(Self {
            base,
            block_size,
            total_blocks,
            free_list,
            in_use: vec![false; total_blocks],
            stats: PoolStats {
                capacity: total_blocks * block_size,
                ..PoolStats::default()
            },
        })
    }

    /// Get the block size used by this pool
    pub fn block_size(&self) -> Size {
        self.block_size
    }

    /// Get memory pool statistics
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Check if no block is in use
    pub fn is_empty(&self) -> bool {
        self.free_list.len() == self.total_blocks
    }

    /// Check if every block is in use
    pub fn is_full(&self) -> bool {
        self.free_list.is_empty()
    }

    fn block_index(&self, addr: Address) -> Option<usize> {
        let offset = addr.checked_sub(self.base)?;
        if offset % self.block_size != 0 {
            return None;
        }
        let index = offset / self.block_size;
        (index < self.total_blocks).then_some(index)
    }
}

impl RegionAllocator for FixedBlockPool {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        if size == 0 || size > self.block_size {
            return None;
        }

        let index = self.free_list.pop()?;
        self.in_use[index] = true;
        self.stats.used += self.block_size;
        self.stats.allocations += 1;
        Some(self.base + index * self.block_size)
    }

    fn release(&mut self, addr: Address) {
        match self.block_index(addr) {
            Some(index) if self.in_use[index] => {
                self.in_use[index] = false;
                self.free_list.push(index);
                self.stats.used -= self.block_size;
                self.stats.releases += 1;
            }
            _ => {
                self.stats.spurious_releases += 1;
                log::warn!("block pool: release of unknown address {:#x}", addr);
            }
        }
    }
}
