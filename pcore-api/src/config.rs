//! Process core configuration

use static_assertions::const_assert;

use crate::error::{invalid_argument, Result};
use crate::types::Size;

/// Capacity of a process name in bytes
pub const PROCESS_NAME_LEN: usize = 32;

/// Default number of process table slots
pub const DEFAULT_MAX_PROCESSES: usize = 64;

/// Default stack size per process (16 KiB)
pub const DEFAULT_STACK_SIZE: Size = 16 * 1024;

/// Default heap size per process (64 KiB)
pub const DEFAULT_HEAP_SIZE: Size = 64 * 1024;

/// Smallest stack that can hold an aligned initial frame
pub const MIN_STACK_SIZE: Size = 64;

const_assert!(DEFAULT_STACK_SIZE >= MIN_STACK_SIZE);
const_assert!(DEFAULT_MAX_PROCESSES > 1);

/// Tunables for the process manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessConfig {
    /// Number of process table slots, the idle process included
    pub max_processes: usize,
    /// Bytes allocated for each process stack
    pub stack_size: Size,
    /// Bytes allocated for each process heap
    pub heap_size: Size,
    /// Scheduler iterations between zombie reaps
    pub reap_interval: u32,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            max_processes: DEFAULT_MAX_PROCESSES,
            stack_size: DEFAULT_STACK_SIZE,
            heap_size: DEFAULT_HEAP_SIZE,
            reap_interval: 1,
        }
    }
}

impl ProcessConfig {
    /// Set the number of table slots
    pub fn with_max_processes(mut self, max_processes: usize) -> Self {
        self.max_processes = max_processes;
        self
    }

    /// Set the per-process stack size
    pub fn with_stack_size(mut self, stack_size: Size) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the per-process heap size
    pub fn with_heap_size(mut self, heap_size: Size) -> Self {
        self.heap_size = heap_size;
        self
    }

    /// Set how many scheduler iterations pass between reaps
    pub fn with_reap_interval(mut self, reap_interval: u32) -> Self {
        self.reap_interval = reap_interval;
        self
    }

    /// Check that the configuration can host at least the idle process
    pub fn validate(&self) -> Result<()> {
        if self.max_processes == 0 {
            return Err(invalid_argument("max_processes must be non-zero"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(invalid_argument("stack_size too small for an initial frame"));
        }
        if self.heap_size == 0 {
            return Err(invalid_argument("heap_size must be non-zero"));
        }
        if self.reap_interval == 0 {
            return Err(invalid_argument("reap_interval must be non-zero"));
        }
        Ok(())
    }
}
