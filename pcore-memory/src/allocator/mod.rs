//! Memory allocator module
//!
//! This module contains the allocator implementations the process core can
//! draw its stack and heap regions from.

pub mod mempool;
pub mod region_pool;

use pcore_api::Size;

/// Allocator statistics.
///
/// Tracks usage and lifetime counters for a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total bytes managed by the pool.
    pub capacity: Size,
    /// Bytes currently handed out.
    pub used: Size,
    /// Successful allocations since creation.
    pub allocations: u64,
    /// Successful releases since creation.
    pub releases: u64,
    /// Releases of addresses the pool never handed out, or handed out and already took back.
    pub spurious_releases: u64,
}

impl PoolStats {
    /// Bytes still available
    pub fn available(&self) -> Size {
        self.capacity - self.used
    }

    /// Number of allocations not yet released
    pub fn outstanding(&self) -> u64 {
        self.allocations - self.releases
    }
}

/// Round `size` up to a multiple of `align`, which must be a power of two
pub(crate) const fn align_up(size: Size, align: Size) -> Size {
    (size + align - 1) & !(align - 1)
}
