//! Memory collaborator interface
//!
//! The process core never manages memory itself. It asks a
//! [`RegionAllocator`] for stack and heap regions at creation time and
//! hands them back when a zombie is reaped.

use alloc::boxed::Box;

use crate::types::{Address, Region, Size};

/// Allocation interface consumed by the process core
///
/// Implementations must succeed or fail atomically: a `None` from
/// [`allocate`](RegionAllocator::allocate) leaves no partial state behind.
pub trait RegionAllocator {
    /// Allocate `size` bytes and return the base address
    fn allocate(&mut self, size: Size) -> Option<Address>;

    /// Return a region previously handed out by [`allocate`](RegionAllocator::allocate)
    ///
    /// Releasing is infallible from the caller's point of view. Unknown
    /// addresses are ignored by the implementation.
    fn release(&mut self, addr: Address);

    /// Allocate `size` bytes and describe the result as a [`Region`]
    fn allocate_region(&mut self, size: Size) -> Option<Region> {
        self.allocate(size).map(|base| Region::new(base, size))
    }
}

impl<T: RegionAllocator + ?Sized> RegionAllocator for &mut T {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        (**self).allocate(size)
    }

    fn release(&mut self, addr: Address) {
        (**self).release(addr)
    }
}

impl<T: RegionAllocator + ?Sized> RegionAllocator for Box<T> {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        (**self).allocate(size)
    }

    fn release(&mut self, addr: Address) {
        (**self).release(addr)
    }
}
