//! Common test utilities for kernel integration tests

#![allow(dead_code)]

use kernel::arch::host::HostContext;
use kernel::process::{ProcessManager, ProcessRef};
use pcore_api::{Address, ProcessConfig, RegionAllocator, Size};
use pcore_memory::RegionPool;

/// Entry point the idle process is created with
pub const IDLE_ENTRY: Address = 0x1000;

/// Start of the simulated memory the test pools hand out
pub const POOL_BASE: Address = 0x100_0000;

/// Size of the simulated memory: room for dozens of default-sized processes
pub const POOL_SIZE: Size = 0x400_0000;

/// Manager type used by the integration tests
pub type TestManager = ProcessManager<TrackingAllocator, HostContext>;

/// Region pool that records every release and can be told to fail
#[derive(Debug)]
pub struct TrackingAllocator {
    pool: RegionPool,
    released: Vec<Address>,
    /// Successful allocations left before the next one fails
    fail_after: Option<usize>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self {
            pool: RegionPool::new(POOL_BASE, POOL_SIZE, 16).expect("valid test pool"),
            released: Vec::new(),
            fail_after: None,
        }
    }

    /// Let `successes` allocations through, then fail exactly one
    pub fn fail_after(&mut self, successes: usize) {
        self.fail_after = Some(successes);
    }

    /// Every address released so far, in order
    pub fn released(&self) -> &[Address] {
        &self.released
    }

    /// How often `addr` has been released
    pub fn release_count(&self, addr: Address) -> usize {
        self.released.iter().filter(|&&released| released == addr).count()
    }

    pub fn pool(&self) -> &RegionPool {
        &self.pool
    }
}

impl RegionAllocator for TrackingAllocator {
    fn allocate(&mut self, size: Size) -> Option<Address> {
        match self.fail_after {
            Some(0) => {
                self.fail_after = None;
                return None;
            }
            Some(left) => self.fail_after = Some(left - 1),
            None => {}
        }
        self.pool.allocate(size)
    }

    fn release(&mut self, addr: Address) {
        self.released.push(addr);
        self.pool.release(addr);
    }
}

/// Default configuration with a small table
pub fn test_config() -> ProcessConfig {
    ProcessConfig::default().with_max_processes(16)
}

/// Manager with the default test configuration
pub fn manager() -> TestManager {
    manager_with(test_config())
}

/// Manager with a custom configuration
pub fn manager_with(config: ProcessConfig) -> TestManager {
    ProcessManager::new(config, TrackingAllocator::new(), HostContext::new(), IDLE_ENTRY)
        .expect("idle process creation")
}

/// Entry point used for the `n`th test process
pub fn entry(n: usize) -> Address {
    0x10_0000 + n * 0x1000
}

/// Create processes named after `names`, in order
pub fn spawn_all(manager: &mut TestManager, names: &[&str]) -> Vec<ProcessRef> {
    names
        .iter()
        .enumerate()
        .map(|(n, name)| manager.create(name, 1, entry(n)).expect("process creation"))
        .collect()
}

/// Names of the records `handles` point at
pub fn names(manager: &TestManager, handles: &[ProcessRef]) -> Vec<String> {
    handles
        .iter()
        .map(|&handle| manager.get(handle).expect("live record").name().to_string())
        .collect()
}
