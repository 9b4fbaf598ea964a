//! Pluggable allocator backends
//!
//! Allocator implementations are registered under a [`BackendKind`] tag and
//! the registry itself is a [`RegionAllocator`]. New regions come from the
//! selected backend; every release is routed back to the backend that
//! handed the address out, even if another backend has been selected since.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use hashbrown::HashMap;
use spin::{Mutex, MutexGuard};

use pcore_api::error::{invalid_argument, Result};
use pcore_api::{Address, RegionAllocator, Size};

/// Type tag naming an allocator backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendKind(pub &'static str);

impl BackendKind {
    /// First-fit [`RegionPool`](crate::RegionPool) backend
    pub const REGION: BackendKind = BackendKind("region");
    /// Fixed-size [`FixedBlockPool`](crate::FixedBlockPool) backend
    pub const BLOCK: BackendKind = BackendKind("block");
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Registry of allocator backends keyed by type tag
#[derive(Default)]
pub struct MemoryBackends {
    backends: HashMap<BackendKind, Box<dyn RegionAllocator + Send>>,
    /// Registration order, for stable listing
    order: Vec<BackendKind>,
    active: Option<BackendKind>,
    /// Which backend issued each live address
    owners: HashMap<Address, BackendKind>,
}

impl MemoryBackends {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `backend` under `kind`
    ///
    /// The first registered backend becomes the active one.
    pub fn register(&mut self, kind: BackendKind, backend: Box<dyn RegionAllocator + Send>) -> Result<()> {
        if self.backends.contains_key(&kind) {
            return Err(invalid_argument("backend kind already registered"));
        }
        self.backends.insert(kind, backend);
        self.order.push(kind);
        if self.active.is_none() {
            self.active = Some(kind);
        }
        log::debug!("Registered memory backend {}", kind);
        Ok(())
    }

    /// Make `kind` the backend new regions are drawn from
    pub fn select(&mut self, kind: BackendKind) -> Result<()> {
        if !self.backends.contains_key(&kind) {
            return Err(invalid_argument("unknown backend kind"));
        }
        self.active = Some(kind);
        Ok(())
    }

    /// Currently selected backend
    pub fn active(&self) -> Option<BackendKind> {
        self.active
    }

    /// Registered backend kinds in registration order
    pub fn kinds(&self) -> &[BackendKind] {
        &self.order
    }

    /// Backend that issued the live address `addr`
    pub fn owner_of(&self, addr: Address) -> Option<BackendKind> {
        self.owners.get(&addr).copied()
    }

    /// Number of addresses handed out and not yet released
    pub fn outstanding(&self) -> usize {
        self.owners.len()
    }
}

impl RegionAllocator for MemoryBackends {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        let kind = self.active?;
        let addr = self.backends.get_mut(&kind)?.allocate(size)?;
        self.owners.insert(addr, kind);
        Some(addr)
    }

    fn release(&mut self, addr: Address) {
        let Some(kind) = self.owners.remove(&addr) else {
            log::warn!("memory backends: release of unknown address {:#x}", addr);
            return;
        };
        if let Some(backend) = self.backends.get_mut(&kind) {
            backend.release(addr);
        }
    }
}

/// A backend that stays inspectable after being handed to a registry
///
/// Clones share the same allocator, so boot code can keep a handle for
/// statistics while the process core owns another one.
pub struct SharedBackend<T>(Arc<Mutex<T>>);

impl<T> SharedBackend<T> {
    /// Wrap `inner` for sharing
    pub fn new(inner: T) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    /// Lock the shared allocator
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock()
    }
}

impl<T> Clone for SharedBackend<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: RegionAllocator> RegionAllocator for SharedBackend<T> {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        self.0.lock().allocate(size)
    }

    fn release(&mut self, addr: Address) {
        self.0.lock().release(addr)
    }
}
