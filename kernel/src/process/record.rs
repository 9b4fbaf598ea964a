//! Process control block

use pcore_api::config::PROCESS_NAME_LEN;
use pcore_api::{Address, Pid, Priority, ProcessState, Region};

use super::queue::{QueueKind, QueueLink};
use crate::arch::RegisterFile;

/// Bounded process name
pub type ProcessName = heapless::String<PROCESS_NAME_LEN>;

/// Process control block
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub(crate) pid: Pid,
    pub(crate) name: ProcessName,
    pub(crate) state: ProcessState,
    pub(crate) priority: Priority,
    pub(crate) entry_point: Address,
    pub(crate) stack: Region,
    pub(crate) heap: Region,
    /// Valid only while the record is not RUNNING
    pub(crate) registers: RegisterFile,
    pub(crate) link: QueueLink,
    /// Scheduler rotation this record was last dispatched in
    pub(crate) rotation: u64,
}

impl ProcessRecord {
    pub(crate) fn new(pid: Pid, name: &str, priority: Priority, entry_point: Address, stack: Region, heap: Region) -> Self {
        Self {
            pid,
            name: bounded_name(name),
            state: ProcessState::New,
            priority,
            entry_point,
            stack,
            heap,
            registers: RegisterFile::zeroed(),
            link: QueueLink::default(),
            rotation: 0,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Informational only; round-robin dispatch ignores it
    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    pub fn stack(&self) -> Region {
        self.stack
    }

    pub fn heap(&self) -> Region {
        self.heap
    }

    /// Saved register snapshot
    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Queue the record is currently linked into
    pub fn queue(&self) -> Option<QueueKind> {
        self.link.queue
    }

    /// Diagnostic summary of this record
    pub fn summary(&self) -> ProcessSummary {
        ProcessSummary {
            pid: self.pid,
            state: self.state,
            priority: self.priority,
            name: self.name.clone(),
        }
    }
}

/// One line of the process listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSummary {
    pub pid: Pid,
    pub state: ProcessState,
    pub priority: Priority,
    pub name: ProcessName,
}

/// Copy `name` into a bounded string, truncating at a char boundary
fn bounded_name(name: &str) -> ProcessName {
    let mut bounded = ProcessName::new();
    for ch in name.chars() {
        if bounded.push(ch).is_err() {
            break;
        }
    }
    bounded
}
