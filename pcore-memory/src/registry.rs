//! Named pool registry
//!
//! Lets boot code carve the physical memory map into named region pools
//! ("stacks", "heaps", ...) and look them up again later by name.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{Address, Size};

use crate::allocator::region_pool::RegionPool;
use crate::allocator::PoolStats;

/// Registry of region pools keyed by name
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: HashMap<String, RegionPool>,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool over `[base, base + size)` and register it under `name`
    ///
    /// Fails if the name is taken, if the range overlaps an existing pool,
    /// or if the pool parameters are invalid.
    pub fn create(&mut self, name: &str, base: Address, size: Size, alignment: Size) -> Result<()> {
        if self.pools.contains_key(name) {
            return Err(invalid_argument("pool name already registered"));
        }
        let pool = RegionPool::new(base, size, alignment)?;
        let range = pool.range();
        let overlaps = self.pools.values().any(|other| {
            let other = other.range();
            range.base < other.top() && other.base < range.top()
        });
        if overlaps {
            return Err(invalid_argument("pool range overlaps an existing pool"));
        }

        log::debug!("Created memory pool {} at {:#x} ({} bytes)", name, base, size);
        self.pools.insert(String::from(name), pool);
        Ok(())
    }

    /// Find a pool by name
    pub fn find(&self, name: &str) -> Option<&RegionPool> {
        self.pools.get(name)
    }

    /// Find a pool by name for allocation
    pub fn find_mut(&mut self, name: &str) -> Option<&mut RegionPool> {
        self.pools.get_mut(name)
    }

    /// Take a pool out of the registry, typically to hand it to a backend
    pub fn remove(&mut self, name: &str) -> Option<RegionPool> {
        self.pools.remove(name)
    }

    /// Statistics of a named pool
    pub fn stats(&self, name: &str) -> Option<PoolStats> {
        self.find(name).map(RegionPool::stats)
    }

    /// Registered pool names in no particular order
    pub fn names(&self) -> Vec<&str> {
        self.pools.keys().map(String::as_str).collect()
    }
}
