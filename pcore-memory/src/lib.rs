//! PCore Memory
//!
//! Memory collaborator for the process core. It hands out address ranges
//! through the [`RegionAllocator`](pcore_api::RegionAllocator) interface and
//! lets several allocator backends be registered side by side under a type
//! tag.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod allocator;
pub mod backend;
pub mod registry;

pub use allocator::mempool::FixedBlockPool;
pub use allocator::region_pool::RegionPool;
pub use allocator::PoolStats;
pub use backend::{BackendKind, MemoryBackends, SharedBackend};
pub use registry::PoolRegistry;
