//! Core types used throughout the process core

use core::fmt;

/// Process identifier type
pub type Pid = u32;

/// Scheduling weight type
pub type Priority = u32;

/// Machine address type
pub type Address = usize;

/// Size type
pub type Size = usize;

/// Execution state of a process record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessState {
    /// Allocated and primed, not yet runnable
    New,
    /// Waiting in the ready queue
    Ready,
    /// Owns the CPU
    Running,
    /// Waiting for an external event
    Blocked,
    /// Parked by an administrative interface
    Suspended,
    /// Exited, waiting to be reaped
    Zombie,
    /// Terminal marker after reap
    Dead,
}

impl ProcessState {
    /// Upper-case label used in diagnostics
    pub const fn as_str(self) -> &'static str {
        match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Suspended => "SUSPENDED",
            ProcessState::Zombie => "ZOMBIE",
            ProcessState::Dead => "DEAD",
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` keeps width specifiers working in table dumps
        f.pad(self.as_str())
    }
}

/// Which owned region of a process an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// Execution stack
    Stack,
    /// Private heap
    Heap,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Stack => write!(f, "stack"),
            RegionKind::Heap => write!(f, "heap"),
        }
    }
}

/// A contiguous memory region described by base address and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    /// First byte of the region
    pub base: Address,
    /// Length in bytes
    pub size: Size,
}

impl Region {
    /// The empty region
    pub const EMPTY: Region = Region { base: 0, size: 0 };

    /// Create a new region
    pub const fn new(base: Address, size: Size) -> Self {
        Self { base, size }
    }

    /// One past the last byte of the region
    ///
    /// Stacks grow down, so this is also the initial stack top.
    pub const fn top(&self) -> Address {
        self.base + self.size
    }

    /// Check whether `addr` falls inside the region
    pub const fn contains(&self, addr: Address) -> bool {
        addr >= self.base && addr < self.base + self.size
    }

    /// Check whether the region has zero length
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}
